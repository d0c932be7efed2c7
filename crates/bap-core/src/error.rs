use thiserror::Error;

#[derive(Error, Debug)]
pub enum BapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid season date '{date}': {reason}")]
    InvalidSeasonDate { date: String, reason: String },

    #[error("Date {date} is outside every window of season {season}")]
    DateOutsideSeason { date: String, season: String },

    #[error("Year {year} is outside the supported range {first}..={last}")]
    UnsupportedYear { year: i32, first: i32, last: i32 },

    #[error("Unknown sensor collection: {0}")]
    UnknownSensor(String),

    #[error("Unknown reducer: {0}")]
    UnknownReducer(String),

    #[error("Invalid score '{name}': {reason}")]
    InvalidScore { name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Band '{band}' not found in image {image}")]
    MissingBand { band: String, image: String },

    #[error("Empty image collection")]
    EmptyCollection,

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Expression error: {0}")]
    Expression(String),

    /// Retryable backend failure (throttling, concurrent aggregation limits).
    #[error("Transient backend error: {0}")]
    Transient(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl BapError {
    /// Whether the retry loop should attempt the evaluation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, BapError>;
