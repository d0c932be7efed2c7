//! Per-criterion quality scores.
//!
//! Every score adds one band, named after the score, whose values lie in
//! `[0, 1]` (or in the score's `range_out` after [`ScoreCommon::adjust`]).
//! [`ScoreConfig`] is the serializable sum of all score kinds.

pub mod atmos_opacity;
pub mod brightness;
pub mod cloud_dist;
pub mod cloud_scene;
pub mod doy;
pub mod index;
pub mod mask_percent;
pub mod medoid;
pub mod multi_year;
pub mod outliers;
pub mod satellite;
pub mod threshold;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use atmos_opacity::AtmosOpacity;
pub use brightness::Brightness;
pub use cloud_dist::CloudDist;
pub use cloud_scene::CloudScene;
pub use doy::Doy;
pub use index::Index;
pub use mask_percent::{MaskPercent, MaskPercentKernel};
pub use medoid::Medoid;
pub use multi_year::MultiYear;
pub use outliers::{OutlierProcess, Outliers};
pub use satellite::Satellite;
pub use threshold::{Bounds, MissingBandPolicy, Threshold};

use crate::catalog::SensorDescriptor;
use crate::error::{BapError, Result};
use crate::image::{Band, Grid, Image, Rect};
use crate::query::Query;
use crate::season::Season;

fn default_range_out() -> (f64, f64) {
    (0.0, 1.0)
}

fn default_stretch() -> f64 {
    1.0
}

/// Settings shared by every score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreCommon {
    /// Output band name; each score kind has its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_range_out")]
    pub range_out: (f64, f64),
    /// Cooperative wait before the score runs, in milliseconds. Each score
    /// kind has its own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_ms: Option<u64>,
}

impl Default for ScoreCommon {
    fn default() -> Self {
        Self {
            name: None,
            range_out: default_range_out(),
            sleep_ms: None,
        }
    }
}

impl ScoreCommon {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Clamp to `[0, 1]`, then rescale linearly to `range_out`.
    pub fn adjust(&self, band: Band) -> Band {
        let (lo, hi) = self.range_out;
        let rescale = (lo, hi) != (0.0, 1.0);
        band.map(|v| {
            let v = v.clamp(0.0, 1.0);
            if rescale {
                (f64::from(v) * (hi - lo) + lo) as f32
            } else {
                v
            }
        })
    }

    pub fn adjust_value(&self, value: f64) -> f64 {
        let (lo, hi) = self.range_out;
        value.clamp(0.0, 1.0) * (hi - lo) + lo
    }

    fn validate(&self, name: &str) -> Result<()> {
        let (lo, hi) = self.range_out;
        if !(lo < hi) {
            return Err(BapError::InvalidScore {
                name: name.to_string(),
                reason: format!("range_out ({lo}, {hi}) must be increasing"),
            });
        }
        Ok(())
    }
}

/// Decay of a score with the distance from its optimum.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecayFunction {
    /// `1 - |d| / half_width`, floored at zero.
    #[default]
    Linear,
    /// Bell with `sigma = half_width * stretch / 2`.
    Gauss {
        #[serde(default = "default_stretch")]
        stretch: f64,
    },
}

impl DecayFunction {
    /// Score of a signed `distance` given the distance at which the linear
    /// form reaches zero.
    pub fn score(&self, distance: f64, half_width: f64) -> f64 {
        if half_width <= 0.0 {
            return if distance == 0.0 { 1.0 } else { 0.0 };
        }
        match self {
            DecayFunction::Linear => (1.0 - distance.abs() / half_width).max(0.0),
            DecayFunction::Gauss { stretch } => {
                let sigma = half_width * stretch / 2.0;
                (-0.5 * (distance / sigma).powi(2)).exp()
            }
        }
    }

    /// Score of `value` peaking at `target` and reaching zero (linearly) at
    /// the ends of `range`. Each side uses its own half width.
    pub fn score_in_range(&self, value: f64, target: f64, range: (f64, f64)) -> f64 {
        let half_width = if value < target {
            target - range.0
        } else {
            range.1 - target
        };
        self.score(value - target, half_width)
    }
}

/// Everything a score may read while being mapped over one sensor-year
/// collection.
#[derive(Clone, Debug)]
pub struct ScoreContext {
    pub sensor: &'static SensorDescriptor,
    /// Schema the bands were rescaled to.
    pub target: &'static SensorDescriptor,
    /// Season year of the collection being scored.
    pub year: i32,
    /// Central year of the composite request.
    pub main_year: i32,
    pub region: Rect,
    pub grid: Grid,
    pub season: Season,
    pub slc_off: bool,
}

impl ScoreContext {
    pub fn image_shape(&self, image: &Image) -> (usize, usize) {
        image.shape().unwrap_or(self.grid.shape())
    }
}

/// Common contract of every score kind.
pub trait Score: fmt::Debug + Send + Sync {
    fn default_name(&self) -> &'static str;

    fn common(&self) -> &ScoreCommon;

    fn common_mut(&mut self) -> &mut ScoreCommon;

    fn name(&self) -> &str {
        self.common().name.as_deref().unwrap_or(self.default_name())
    }

    fn default_sleep_ms(&self) -> u64 {
        0
    }

    fn sleep_ms(&self) -> u64 {
        self.common().sleep_ms.unwrap_or_else(|| self.default_sleep_ms())
    }

    /// Check parameters at configuration time.
    fn validate(&self) -> Result<()> {
        self.common().validate(self.name())
    }

    /// Append the stages adding this score's band to every image of `query`.
    fn map(&self, query: Query, ctx: &ScoreContext) -> Query;
}

/// Scores computed from one image at a time.
pub trait ImageScore: Score + Clone + 'static {
    /// Unadjusted score band in `[0, 1]`.
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band>;
}

/// Map an [`ImageScore`] over a query, adjusting its output.
pub(crate) fn map_image_score<S: ImageScore>(score: &S, query: Query, ctx: &ScoreContext) -> Query {
    let score = score.clone();
    let ctx = ctx.clone();
    let name = score.name().to_string();
    query.map(format!("score {name}"), move |mut img| {
        let band = score.compute(&img, &ctx)?;
        img.add_band(name.as_str(), score.common().adjust(band));
        Ok(img)
    })
}

/// Map a constant zero band named `name`.
pub(crate) fn map_zero_band(name: &str, query: Query, ctx: &ScoreContext) -> Query {
    let name = name.to_string();
    let grid = ctx.grid;
    query.map(format!("zero {name}"), move |mut img| {
        let shape = img.shape().unwrap_or(grid.shape());
        img.add_band(name.as_str(), Band::constant(shape, 0.0));
        Ok(img)
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScoreConfig {
    CloudScene(CloudScene),
    CloudDist(CloudDist),
    Doy(Doy),
    AtmosOpacity(AtmosOpacity),
    MaskPercent(MaskPercent),
    MaskPercentKernel(MaskPercentKernel),
    Satellite(Satellite),
    Outliers(Outliers),
    Index(Index),
    MultiYear(MultiYear),
    Threshold(Threshold),
    Medoid(Medoid),
    Brightness(Brightness),
}

impl ScoreConfig {
    pub fn as_score(&self) -> &dyn Score {
        match self {
            ScoreConfig::CloudScene(s) => s,
            ScoreConfig::CloudDist(s) => s,
            ScoreConfig::Doy(s) => s,
            ScoreConfig::AtmosOpacity(s) => s,
            ScoreConfig::MaskPercent(s) => s,
            ScoreConfig::MaskPercentKernel(s) => s,
            ScoreConfig::Satellite(s) => s,
            ScoreConfig::Outliers(s) => s,
            ScoreConfig::Index(s) => s,
            ScoreConfig::MultiYear(s) => s,
            ScoreConfig::Threshold(s) => s,
            ScoreConfig::Medoid(s) => s,
            ScoreConfig::Brightness(s) => s,
        }
    }

    pub fn as_score_mut(&mut self) -> &mut dyn Score {
        match self {
            ScoreConfig::CloudScene(s) => s,
            ScoreConfig::CloudDist(s) => s,
            ScoreConfig::Doy(s) => s,
            ScoreConfig::AtmosOpacity(s) => s,
            ScoreConfig::MaskPercent(s) => s,
            ScoreConfig::MaskPercentKernel(s) => s,
            ScoreConfig::Satellite(s) => s,
            ScoreConfig::Outliers(s) => s,
            ScoreConfig::Index(s) => s,
            ScoreConfig::MultiYear(s) => s,
            ScoreConfig::Threshold(s) => s,
            ScoreConfig::Medoid(s) => s,
            ScoreConfig::Brightness(s) => s,
        }
    }

    /// Variant tag, as written in configuration files.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreConfig::CloudScene(_) => "CloudScene",
            ScoreConfig::CloudDist(_) => "CloudDist",
            ScoreConfig::Doy(_) => "Doy",
            ScoreConfig::AtmosOpacity(_) => "AtmosOpacity",
            ScoreConfig::MaskPercent(_) => "MaskPercent",
            ScoreConfig::MaskPercentKernel(_) => "MaskPercentKernel",
            ScoreConfig::Satellite(_) => "Satellite",
            ScoreConfig::Outliers(_) => "Outliers",
            ScoreConfig::Index(_) => "Index",
            ScoreConfig::MultiYear(_) => "MultiYear",
            ScoreConfig::Threshold(_) => "Threshold",
            ScoreConfig::Medoid(_) => "Medoid",
            ScoreConfig::Brightness(_) => "Brightness",
        }
    }

    pub fn name(&self) -> &str {
        self.as_score().name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.as_score_mut().common_mut().name = Some(name.into());
    }

    pub fn validate(&self) -> Result<()> {
        self.as_score().validate()
    }

    /// Maximum value this score can contribute.
    pub fn max(&self) -> f64 {
        self.as_score().common().range_out.1
    }

    /// Scores left out of SLC-off Landsat 7 collections, whose striping
    /// would dominate the mask statistics.
    pub fn skipped_when_slc_off(&self) -> bool {
        matches!(
            self,
            ScoreConfig::MaskPercent(_) | ScoreConfig::MaskPercentKernel(_)
        )
    }

    /// Append this score to `query`, preceded by its pacing stage.
    pub fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        let score = self.as_score();
        let sleep = score.sleep_ms();
        let query = query.pace(format!("sleep before {}", score.name()), Duration::from_millis(sleep));
        if ctx.slc_off && self.skipped_when_slc_off() {
            return map_zero_band(score.name(), query, ctx);
        }
        score.map(query, ctx)
    }
}
