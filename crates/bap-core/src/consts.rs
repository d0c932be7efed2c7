/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Largest kernel radius (in pixels) the backend accepts for distance and
/// neighbourhood kernels.
pub const MAX_KERNEL_RADIUS: usize = 255;

/// Default name of the composite quality band.
pub const DEFAULT_SCORE_BAND: &str = "score";

/// Band holding the numeric collection code of each candidate.
pub const COL_ID_BAND: &str = "col_id";

/// Band holding the acquisition date as chrono's day number counted from
/// 0001-01-01 (exact in `f32`).
pub const DATE_BAND: &str = "date";

/// Image property tagging the season year an image was gathered for.
pub const YEAR_PROPERTY: &str = "YEAR_BAP";

/// Format version written into every composite's provenance.
pub const BAP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Step used to sample an expression's input range for its statistics and
/// maximum result.
pub const EXPRESSION_SAMPLE_STEP: f64 = 1.0;

/// Decimal places kept in the mask-percent fraction.
pub const MASK_PERCENT_DECIMALS: i32 = 4;

/// Percentile interval averaged by the interval-mean reducer.
pub const INTERVAL_MEAN_PERCENTILES: (f64, f64) = (50.0, 90.0);

/// Default number of best-scored candidates kept by statistical reduction.
pub const DEFAULT_REDUCE_SET: usize = 5;

/// Default number of evaluation attempts for a materialization.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

/// Default linear backoff step between attempts, in milliseconds.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 2_000;

/// First year covered by the satellite priority table.
pub const FIRST_PRIORITY_YEAR: i32 = 1972;

/// Year Landsat 7's scan line corrector failed.
pub const SLC_OFF_FIRST_YEAR: i32 = 2003;

/// Default pacing before scores that hit a remote backend hardest.
pub const CLOUD_DIST_SLEEP_MS: u64 = 10_000;
pub const MASK_PERCENT_SLEEP_MS: u64 = 30_000;
pub const OUTLIERS_SLEEP_MS: u64 = 10_000;
