use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use super::{Score, ScoreCommon, ScoreContext};
use crate::catalog::{ATMOS_OPACITY, CANONICAL_BANDS};
use crate::image::{Band, Image};
use crate::query::Query;
use crate::stats::median;

fn default_discard_zeros() -> bool {
    true
}

/// Closeness of each candidate to the per-pixel median spectrum.
///
/// The squared distance `d` to the median vector is scored `1 - d / d_max`,
/// `d_max` being the largest distance at that pixel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Medoid {
    #[serde(flatten)]
    pub common: ScoreCommon,
    /// Bands of the spectrum; the canonical reflectance bands present when
    /// empty.
    #[serde(default)]
    pub bands: Vec<String>,
    /// Leave zero values out of the median.
    #[serde(default = "default_discard_zeros")]
    pub discard_zeros: bool,
}

impl Default for Medoid {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            bands: Vec::new(),
            discard_zeros: default_discard_zeros(),
        }
    }
}

impl Medoid {
    fn spectrum_bands(&self, first: &Image) -> Vec<String> {
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

    pub fn score_stack(&self, images: &[Image], ctx: &ScoreContext) -> Vec<Band> {
        let Some(first) = images.first() else {
            return Vec::new();
        };
        let shape = ctx.image_shape(first);
        let mut distances = vec![Array2::<f32>::zeros(shape); images.len()];
        let mut valid = vec![Array2::from_elem(shape, true); images.len()];

        for name in self.spectrum_bands(first) {
            let stack: Vec<Option<&Band>> = images.iter().map(|img| img.band(&name)).collect();
            let medians = Array2::from_shape_fn(shape, |(row, col)| {
                let mut values: Vec<f32> = stack
                    .iter()
                    .filter_map(|b| b.and_then(|b| b.get(row, col)))
                    .filter(|&v| !(self.discard_zeros && v == 0.0))
                    .collect();
                median(&mut values)
            });
            for (i, band) in stack.iter().enumerate() {
                let Some(band) = band else {
                    valid[i].fill(false);
                    continue;
                };
                Zip::from(&mut distances[i])
                    .and(&mut valid[i])
                    .and(&band.data)
                    .and(&band.mask)
                    .and(&medians)
                    .for_each(|d, ok, &v, &m, &med| {
                        *ok = *ok && m;
                        *d += (v - med).powi(2);
                    });
            }
        }

        let mut d_max = Array2::<f32>::zeros(shape);
        for (d, ok) in distances.iter().zip(&valid) {
            Zip::from(&mut d_max).and(d).and(ok).for_each(|mx, &d, &ok| {
                if ok && d > *mx {
                    *mx = d;
                }
            });
        }

        distances
            .into_iter()
            .zip(valid)
            .map(|(d, ok)| {
                let mut data = d;
                Zip::from(&mut data).and(&d_max).for_each(|v, &mx| {
                    *v = if mx > 0.0 { 1.0 - *v / mx } else { 1.0 };
                });
                Band { data, mask: ok }
            })
            .collect()
    }
}

impl Score for Medoid {
    fn default_name(&self) -> &'static str {
        "score-medoid"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        let score = self.clone();
        let ctx = ctx.clone();
        let name = score.name().to_string();
        query.collection(format!("score {name}"), move |mut images| {
            let bands = score.score_stack(&images, &ctx);
            for (img, band) in images.iter_mut().zip(bands) {
                img.add_band(name.as_str(), score.common.adjust(band));
            }
            Ok(images)
        })
    }
}
