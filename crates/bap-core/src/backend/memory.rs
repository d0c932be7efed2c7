use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Backend;
use crate::catalog::SensorId;
use crate::error::{BapError, Result};
use crate::image::{Grid, Image};

/// Serializable snapshot of a backend's collections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub grid: Grid,
    #[serde(default)]
    pub collections: BTreeMap<SensorId, Vec<Image>>,
}

/// Backend holding every collection in memory.
#[derive(Clone, Debug)]
pub struct InMemoryBackend {
    grid: Grid,
    collections: BTreeMap<SensorId, Vec<Image>>,
}

impl InMemoryBackend {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            collections: BTreeMap::new(),
        }
    }

    pub fn from_scene(scene: Scene) -> Result<Self> {
        let mut backend = Self::new(scene.grid);
        for (sensor, images) in scene.collections {
            for image in images {
                backend.add_image(sensor, image)?;
            }
        }
        Ok(backend)
    }

    /// Load a JSON [`Scene`] from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let scene: Scene = serde_json::from_reader(std::io::BufReader::new(file))?;
        debug!(path = %path.display(), sensors = scene.collections.len(), "loaded scene");
        Self::from_scene(scene)
    }

    pub fn to_scene(&self) -> Scene {
        Scene {
            grid: self.grid,
            collections: self.collections.clone(),
        }
    }

    /// Add an image to a collection. Its bands must match the grid.
    pub fn add_image(&mut self, sensor: SensorId, mut image: Image) -> Result<()> {
        for (_, band) in &image.bands {
            if band.dim() != self.grid.shape() {
                return Err(BapError::ShapeMismatch {
                    expected: self.grid.shape(),
                    found: band.dim(),
                });
            }
        }
        image.sensor = Some(sensor);
        self.collections.entry(sensor).or_default().push(image);
        Ok(())
    }

    pub fn with_image(mut self, sensor: SensorId, image: Image) -> Result<Self> {
        self.add_image(sensor, image)?;
        Ok(self)
    }

    pub fn image_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

impl Backend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn grid(&self) -> Grid {
        self.grid
    }

    fn collection(&self, sensor: SensorId) -> Result<Vec<Image>> {
        Ok(self.collections.get(&sensor).cloned().unwrap_or_default())
    }

    fn paces(&self) -> bool {
        false
    }
}
