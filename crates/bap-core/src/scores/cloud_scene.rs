use serde::{Deserialize, Serialize};

use super::{map_image_score, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::error::Result;
use crate::expression::Formula;
use crate::image::{Band, Image};
use crate::query::Query;

const CLOUD_COVER_RANGE: (f64, f64) = (0.0, 100.0);

/// Scene-level cloud cover through a decaying formula. Constant per image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudScene {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default)]
    pub formula: Formula,
}

impl Score for CloudScene {
    fn default_name(&self) -> &'static str {
        "score-cld-esc"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        self.formula.build(CLOUD_COVER_RANGE).map(|_| ())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for CloudScene {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let shape = ctx.image_shape(image);
        let cover = ctx.sensor.cloud_cover.and_then(|prop| image.property(prop));
        let Some(cover) = cover else {
            return Ok(Band::constant(shape, 0.0));
        };
        let expr = self.formula.build(CLOUD_COVER_RANGE)?;
        let value = expr.eval_normalized(cover.clamp(CLOUD_COVER_RANGE.0, CLOUD_COVER_RANGE.1));
        Ok(Band::constant(shape, value as f32))
    }
}
