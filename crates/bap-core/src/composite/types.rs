/// Compositing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeStage {
    Planning,
    Gathering,
    Harmonizing,
    Selecting,
}

impl std::fmt::Display for CompositeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "Planning queries"),
            Self::Gathering => write!(f, "Gathering candidates"),
            Self::Harmonizing => write!(f, "Harmonizing pool"),
            Self::Selecting => write!(f, "Selecting pixels"),
        }
    }
}

/// Thread-safe progress reporting for compositing.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items
    /// in this stage (e.g., sensor/year collections), if known.
    fn begin_stage(&self, _stage: CompositeStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
