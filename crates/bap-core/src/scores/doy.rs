use serde::{Deserialize, Serialize};

use super::{map_image_score, DecayFunction, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::error::Result;
use crate::image::{Band, Image};
use crate::query::Query;

/// Proximity of the acquisition date to the season's best day.
///
/// The score peaks at the best day of the image's season window and
/// reaches zero (linear decay) at the window edges, each side measured
/// separately so asymmetric seasons work across the year boundary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Doy {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default)]
    pub function: DecayFunction,
}

impl Doy {
    /// Score of an acquisition date for season year `year`.
    pub fn score_date(&self, date: chrono::NaiveDate, ctx: &ScoreContext) -> Result<f64> {
        let window = ctx.season.add_year(ctx.year)?;
        let best = ctx.season.best_date(ctx.year)?;
        let distance = (date - best).num_days() as f64;
        let before = (best - window.start).num_days() as f64;
        let after = (window.end - best).num_days() as f64;
        Ok(self.function.score_in_range(distance, 0.0, (-before, after)))
    }
}

impl Score for Doy {
    fn default_name(&self) -> &'static str {
        "score-doy"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for Doy {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let value = self.score_date(image.date, ctx)?;
        Ok(Band::constant(ctx.image_shape(image), value as f32))
    }
}
