use serde::{Deserialize, Serialize};

use super::{map_image_score, DecayFunction, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::error::{BapError, Result};
use crate::image::{Band, Image};
use crate::query::Query;

fn default_ratio() -> f64 {
    0.05
}

/// Closeness of the image's season to the composite's main year.
///
/// With the default linear decay a neighbouring season scores
/// `1 - ratio`; the year-bucket tag, when present, takes precedence over
/// the acquisition date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiYear {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default = "default_ratio")]
    pub ratio: f64,
    #[serde(default)]
    pub function: DecayFunction,
}

impl Default for MultiYear {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            ratio: default_ratio(),
            function: DecayFunction::default(),
        }
    }
}

impl MultiYear {
    pub fn year_distance(&self, image: &Image, ctx: &ScoreContext) -> Result<i32> {
        match image.year_bucket {
            Some(bucket) => Ok(ctx.main_year - bucket),
            None => ctx.season.year_diff(image.date, ctx.main_year, true),
        }
    }

    pub fn score_distance(&self, years: i32) -> f64 {
        self.function.score(f64::from(years), 1.0 / self.ratio)
    }
}

impl Score for MultiYear {
    fn default_name(&self) -> &'static str {
        "score-multi"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        if self.ratio <= 0.0 || self.ratio > 1.0 {
            return Err(BapError::InvalidScore {
                name: self.name().to_string(),
                reason: format!("ratio must lie in (0, 1], got {}", self.ratio),
            });
        }
        Ok(())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for MultiYear {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let years = self.year_distance(image, ctx)?;
        Ok(Band::constant(ctx.image_shape(image), self.score_distance(years) as f32))
    }
}
