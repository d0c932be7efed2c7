use serde::{Deserialize, Serialize};

use super::{map_image_score, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::catalog::ATMOS_OPACITY;
use crate::error::Result;
use crate::expression::Formula;
use crate::image::{Band, Image};
use crate::query::Query;

fn default_range() -> (f64, f64) {
    (100.0, 300.0)
}

/// Per-pixel atmospheric opacity through a decaying formula. Low opacity
/// scores high; images without the band get zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtmosOpacity {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default)]
    pub formula: Formula,
    #[serde(default = "default_range")]
    pub range_in: (f64, f64),
}

impl Default for AtmosOpacity {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            formula: Formula::default(),
            range_in: default_range(),
        }
    }
}

impl Score for AtmosOpacity {
    fn default_name(&self) -> &'static str {
        "score-atm-op"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        self.formula.build(self.range_in).map(|_| ())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for AtmosOpacity {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let Some(band) = image.band(ATMOS_OPACITY) else {
            return Ok(Band::constant(ctx.image_shape(image), 0.0));
        };
        let expr = self.formula.build(self.range_in)?;
        let (lo, hi) = self.range_in;
        let clamped = band.map(|v| (f64::from(v).clamp(lo, hi)) as f32);
        Ok(expr.apply_band(&clamped, true))
    }
}
