//! Per-pixel outlier detection across the candidate stack.
//!
//! For every band and pixel the non-zero valid values of all images are
//! collected. With [`OutlierProcess::Mean`] the accepted interval is
//! `mean ± amount * std`; with [`OutlierProcess::Median`] it lies between the
//! percentiles `50 ± 50 * amount`. An image scores the fraction of tested
//! bands whose value falls inside.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Score, ScoreCommon, ScoreContext};
use crate::catalog::{ATMOS_OPACITY, CANONICAL_BANDS};
use crate::consts::OUTLIERS_SLEEP_MS;
use crate::error::{BapError, Result};
use crate::image::{Band, Image};
use crate::query::Query;
use crate::stats::{mean_stddev, percentile};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierProcess {
    Mean,
    #[default]
    Median,
}

impl OutlierProcess {
    pub fn default_amount(&self) -> f64 {
        match self {
            OutlierProcess::Mean => 0.7,
            OutlierProcess::Median => 0.5,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Outliers {
    #[serde(flatten)]
    pub common: ScoreCommon,
    /// Bands to test; the canonical reflectance bands present when empty.
    #[serde(default)]
    pub bands: Vec<String>,
    #[serde(default)]
    pub process: OutlierProcess,
    /// Interval width; `k` for the mean process, percentile half-width / 50
    /// for the median process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl Outliers {
    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(self.process.default_amount())
    }

    fn tested_bands(&self, first: &Image) -> Vec<String> {
        if self.bands.is_empty() {
            CANONICAL_BANDS
                .iter()
                .filter(|b| **b != ATMOS_OPACITY && first.has_band(b))
                .map(|b| b.to_string())
                .collect()
        } else {
            self.bands.clone()
        }
    }

    /// Accepted interval of the given stack values, or `None` when empty.
    pub fn interval(&self, values: &mut [f32]) -> Option<(f32, f32)> {
        if values.is_empty() {
            return None;
        }
        let amount = self.amount();
        match self.process {
            OutlierProcess::Mean => {
                let (mean, std) = mean_stddev(values);
                let k = amount as f32 * std;
                Some((mean - k, mean + k))
            }
            OutlierProcess::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let half = 50.0 * amount;
                Some((percentile(values, 50.0 - half), percentile(values, 50.0 + half)))
            }
        }
    }

    /// Score bands for a whole stack, one per image in input order.
    pub fn score_stack(&self, images: &[Image], ctx: &ScoreContext) -> Vec<Band> {
        let Some(first) = images.first() else {
            return Vec::new();
        };
        let shape = ctx.image_shape(first);
        let bands = self.tested_bands(first);
        let mut inside = vec![Array2::<f32>::zeros(shape); images.len()];
        if bands.is_empty() {
            return inside.into_iter().map(Band::new).collect();
        }

        for name in &bands {
            let stack: Vec<Option<&Band>> = images.iter().map(|img| img.band(name)).collect();
            let value_at = |i: usize, row: usize, col: usize| -> Option<f32> {
                stack[i]
                    .and_then(|b| b.get(row, col))
                    .filter(|&v| v != 0.0)
            };
            let bounds = Array2::from_shape_fn(shape, |(row, col)| {
                let mut values: Vec<f32> = (0..images.len()).filter_map(|i| value_at(i, row, col)).collect();
                self.interval(&mut values)
            });
            for (i, counts) in inside.iter_mut().enumerate() {
                for ((row, col), count) in counts.indexed_iter_mut() {
                    let (Some(v), Some((lo, hi))) = (value_at(i, row, col), bounds[[row, col]]) else {
                        continue;
                    };
                    if v >= lo && v <= hi {
                        *count += 1.0;
                    }
                }
            }
        }

        let n = bands.len() as f32;
        inside
            .into_iter()
            .map(|counts| Band::new(counts.mapv(|c| c / n)))
            .collect()
    }
}

impl Score for Outliers {
    fn default_name(&self) -> &'static str {
        "score-outlier"
    }

    fn default_sleep_ms(&self) -> u64 {
        OUTLIERS_SLEEP_MS
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        let amount = self.amount();
        let bad = match self.process {
            OutlierProcess::Mean => amount <= 0.0,
            OutlierProcess::Median => amount <= 0.0 || amount > 1.0,
        };
        if bad {
            return Err(BapError::InvalidScore {
                name: self.name().to_string(),
                reason: format!("amount {amount} out of range for the {:?} process", self.process),
            });
        }
        Ok(())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        let score = self.clone();
        let ctx = ctx.clone();
        let name = score.name().to_string();
        query.collection(format!("score {name}"), move |mut images| {
            debug!(score = %name, images = images.len(), "outlier statistics");
            let bands = score.score_stack(&images, &ctx);
            for (img, band) in images.iter_mut().zip(bands) {
                img.add_band(name.as_str(), score.common.adjust(band));
            }
            Ok(images)
        })
    }
}
