//! Distance-to-cloud score.
//!
//! Each valid pixel is scored by its distance to the nearest masked pixel of
//! the image's first band:
//!
//! ```text
//! score = 1 - exp((-d + dmin) / (dmax * factor))
//! ```
//!
//! with `d` in metres. Pixels further than `dmax` from any masked pixel
//! score 1; masked pixels stay masked.

use ndarray::Zip;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{map_image_score, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::consts::{CLOUD_DIST_SLEEP_MS, MAX_KERNEL_RADIUS};
use crate::error::{BapError, Result};
use crate::image::{Band, Image};
use crate::kernel::{distance_to_masked, DistanceMetric};
use crate::query::Query;

fn default_factor() -> f64 {
    0.2
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloudDist {
    #[serde(flatten)]
    pub common: ScoreCommon,
    /// Distance in metres below which a pixel scores 0.
    #[serde(default)]
    pub dmin: f64,
    /// Distance in metres from which a pixel scores 1. Defaults to, and is
    /// capped at, the sensor's finest band scale times 255.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dmax: Option<f64>,
    #[serde(default)]
    pub kernel: DistanceMetric,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

impl Default for CloudDist {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            dmin: 0.0,
            dmax: None,
            kernel: DistanceMetric::default(),
            factor: default_factor(),
        }
    }
}

impl CloudDist {
    /// Effective `dmax` in metres for a sensor whose finest band has `scale`.
    pub fn dmax_for(&self, scale: f64) -> f64 {
        let cap = scale * MAX_KERNEL_RADIUS as f64;
        match self.dmax {
            Some(d) if d < cap => d,
            Some(d) => {
                debug!(dmax = d, cap, "cloud distance capped");
                cap
            }
            None => cap,
        }
    }

    /// Score of a single distance in metres.
    pub fn score_distance(&self, distance: f64, dmax: f64) -> f64 {
        if distance > dmax {
            return 1.0;
        }
        1.0 - ((-distance + self.dmin) / (dmax * self.factor)).exp()
    }
}

impl Score for CloudDist {
    fn default_name(&self) -> &'static str {
        "score-cld-dist"
    }

    fn default_sleep_ms(&self) -> u64 {
        CLOUD_DIST_SLEEP_MS
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        let invalid = |reason: String| BapError::InvalidScore {
            name: self.name().to_string(),
            reason,
        };
        if self.factor <= 0.0 {
            return Err(invalid(format!("factor must be positive, got {}", self.factor)));
        }
        if self.dmin < 0.0 {
            return Err(invalid(format!("dmin must not be negative, got {}", self.dmin)));
        }
        if let Some(dmax) = self.dmax {
            if dmax <= self.dmin {
                return Err(invalid(format!("dmax {dmax} must exceed dmin {}", self.dmin)));
            }
        }
        Ok(())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for CloudDist {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let Some((first, band)) = image.bands.first() else {
            return Err(BapError::MissingBand {
                band: "<first>".into(),
                image: image.id.clone(),
            });
        };
        let scale = ctx
            .sensor
            .bands
            .iter()
            .map(|b| b.scale)
            .fold(ctx.sensor.scale, f64::min);
        let dmax = self.dmax_for(scale);
        let pixel = ctx.grid.pixel_size.max(f64::EPSILON);
        let radius = ((dmax / pixel).ceil() as usize).clamp(1, MAX_KERNEL_RADIUS);
        debug!(image = %image.id, band = %first, dmax, radius, "cloud distance");

        let distances = distance_to_masked(&band.mask, self.kernel, radius);
        let mut data = distances.mapv(|_| 0.0f32);
        Zip::from(&mut data)
            .and(&distances)
            .and(&band.mask)
            .for_each(|out, &d, &valid| {
                if valid {
                    *out = self.score_distance(f64::from(d) * pixel, dmax) as f32;
                }
            });
        Band::with_mask(data, band.mask.clone())
    }
}
