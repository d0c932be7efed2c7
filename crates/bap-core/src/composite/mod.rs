pub mod config;
mod helpers;
mod orchestrator;
mod provenance;
mod reduce;
mod types;

pub use config::{BapConfig, Reducer, Selection};
pub use helpers::{date_from_band_value, date_to_band_value};
pub use orchestrator::{Bap, CollectionPlan};
pub use provenance::{Composite, Provenance};
pub use reduce::{quality_mosaic, reduce_pool};
pub use types::{CompositeStage, NoOpReporter, ProgressReporter};
