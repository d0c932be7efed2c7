use serde::{Deserialize, Serialize};

use super::{Score, ScoreCommon, ScoreContext};
use crate::catalog::SensorId;
use crate::error::{BapError, Result};
use crate::image::Band;
use crate::priority::priority_index;
use crate::query::Query;

fn default_rate() -> f64 {
    0.05
}

/// Sensor priority for the collection's year: `1 - rate * position`.
/// Sensors absent from the year's priority list score 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default = "default_rate")]
    pub rate: f64,
}

impl Default for Satellite {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            rate: default_rate(),
        }
    }
}

impl Satellite {
    pub fn score_for(&self, year: i32, sensor: SensorId) -> f64 {
        match priority_index(year, sensor) {
            Some(index) => (1.0 - self.rate * index as f64).max(0.0),
            None => 0.0,
        }
    }
}

impl Score for Satellite {
    fn default_name(&self) -> &'static str {
        "score-sat"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        if !(0.0..=1.0).contains(&self.rate) {
            return Err(BapError::InvalidScore {
                name: self.name().to_string(),
                reason: format!("rate must lie in [0, 1], got {}", self.rate),
            });
        }
        Ok(())
    }

    /// The value depends only on the collection, so it is resolved once
    /// while the query is built.
    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        let value = self.score_for(ctx.year, ctx.sensor.id);
        let adjusted = self.common.adjust_value(value) as f32;
        let name = self.name().to_string();
        let grid = ctx.grid;
        query.map(format!("score {name}"), move |mut img| {
            let shape = img.shape().unwrap_or(grid.shape());
            img.add_band(name.as_str(), Band::constant(shape, adjusted));
            img.set_property(name.as_str(), value);
            Ok(img)
        })
    }
}
