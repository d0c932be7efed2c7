use serde::{Deserialize, Serialize};

use super::{map_image_score, DecayFunction, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::catalog::{BLUE, GREEN, NIR, RED, SWIR};
use crate::error::{BapError, Result};
use crate::image::{Band, Image};
use crate::query::Query;

fn default_target() -> f64 {
    1.0
}

fn default_bands() -> Vec<String> {
    [GREEN, BLUE, RED, NIR, SWIR].iter().map(|b| b.to_string()).collect()
}

/// Sum of the selected bands against a target share of their theoretical
/// maximum, taken from the target schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brightness {
    #[serde(flatten)]
    pub common: ScoreCommon,
    /// Share of the maximum brightness that scores 1.
    #[serde(default = "default_target")]
    pub target: f64,
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,
    #[serde(default)]
    pub function: DecayFunction,
}

impl Default for Brightness {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            target: default_target(),
            bands: default_bands(),
            function: DecayFunction::default(),
        }
    }
}

impl Brightness {
    /// `(range, optimum)` of the band sum for the given schema.
    pub fn bounds(&self, ctx: &ScoreContext) -> ((f64, f64), f64) {
        let maxima: Vec<f64> = self
            .bands
            .iter()
            .filter_map(|b| ctx.target.max_of(b))
            .collect();
        let max = maxima.iter().copied().fold(0.0, f64::max);
        let total = max * maxima.len() as f64;
        ((0.0, total), total * self.target)
    }
}

impl Score for Brightness {
    fn default_name(&self) -> &'static str {
        "score-brightness"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        if !(0.0..=1.0).contains(&self.target) || self.bands.is_empty() {
            return Err(BapError::InvalidScore {
                name: self.name().to_string(),
                reason: format!(
                    "target must lie in [0, 1] and bands must not be empty (target {}, {} band(s))",
                    self.target,
                    self.bands.len()
                ),
            });
        }
        Ok(())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for Brightness {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let shape = ctx.image_shape(image);
        let present: Vec<&Band> = self.bands.iter().filter_map(|b| image.band(b)).collect();
        if present.is_empty() {
            return Ok(Band::constant(shape, 0.0));
        }
        let (range, optimum) = self.bounds(ctx);
        let mut sum = Band::constant(shape, 0.0);
        for band in present {
            sum.data += &band.data;
            sum.update_mask(&band.mask);
        }
        Ok(sum.map(|v| self.function.score_in_range(f64::from(v), optimum, range) as f32))
    }
}
