use serde::{Deserialize, Serialize};

use super::{map_image_score, DecayFunction, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::error::{BapError, Result};
use crate::image::{Band, Image};
use crate::indices::IndexKind;
use crate::query::Query;

fn default_index() -> IndexKind {
    IndexKind::Ndvi
}

fn default_target() -> f64 {
    0.8
}

fn default_range_in() -> (f64, f64) {
    (0.0, 1.0)
}

/// Closeness of a spectral index to a target value inside `range_in`.
/// The index is computed on the fly when its band is absent; images that
/// also lack its input bands score 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Index {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default = "default_index")]
    pub index: IndexKind,
    #[serde(default = "default_target")]
    pub target: f64,
    #[serde(default = "default_range_in")]
    pub range_in: (f64, f64),
    #[serde(default)]
    pub function: DecayFunction,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            index: default_index(),
            target: default_target(),
            range_in: default_range_in(),
            function: DecayFunction::default(),
        }
    }
}

impl Index {
    pub fn score_value(&self, value: f64) -> f64 {
        let (lo, hi) = self.range_in;
        if value < lo || value > hi {
            return 0.0;
        }
        self.function.score_in_range(value, self.target, self.range_in)
    }
}

impl Score for Index {
    fn default_name(&self) -> &'static str {
        "score-index"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        let (lo, hi) = self.range_in;
        if !(lo < hi) || self.target < lo || self.target > hi {
            return Err(BapError::InvalidScore {
                name: self.name().to_string(),
                reason: format!("target {} must lie inside range_in ({lo}, {hi})", self.target),
            });
        }
        Ok(())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for Index {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let computed;
        let band = match image.band(self.index.band_name()) {
            Some(band) => band,
            None => match self.index.compute(image) {
                Some(band) => {
                    computed = band;
                    &computed
                }
                None => return Ok(Band::constant(ctx.image_shape(image), 0.0)),
            },
        };
        Ok(band.map(|v| self.score_value(f64::from(v)) as f32))
    }
}
