pub mod memory;

pub use memory::{InMemoryBackend, Scene};

use crate::catalog::SensorId;
use crate::error::Result;
use crate::image::{Grid, Image};
use crate::query::Query;

/// Deferred execution engine holding the raw sensor collections.
///
/// Every image a backend hands out lives on the backend's [`Grid`].
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    fn grid(&self) -> Grid;

    /// Raw images of one collection. Unknown collections are empty.
    fn collection(&self, sensor: SensorId) -> Result<Vec<Image>>;

    /// Whether pace stages wait. Backends without rate limits skip them.
    fn paces(&self) -> bool {
        true
    }

    /// Materialise a query. This is the only call that computes pixels.
    fn evaluate(&self, query: &Query) -> Result<Vec<Image>> {
        let fetch = |sensor: SensorId| self.collection(sensor);
        if self.paces() {
            query.evaluate(&fetch)
        } else {
            query.evaluate_unpaced(&fetch)
        }
    }
}
