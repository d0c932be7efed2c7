use std::collections::BTreeMap;

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use super::{map_image_score, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::error::{BapError, Result};
use crate::image::{Band, Image};
use crate::query::Query;

/// Optional inclusive limits for one band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn passes(&self, value: f64) -> bool {
        self.min.is_none_or(|m| value >= m) && self.max.is_none_or(|m| value <= m)
    }
}

/// What a tested band does when it has no threshold entry or is absent
/// from the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBandPolicy {
    /// Reject the configuration, or the image lacking the band.
    Fail,
    /// The band always passes.
    PassThrough,
}

/// Fraction of bands whose value lies inside its thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default)]
    pub thresholds: BTreeMap<String, Bounds>,
    /// Bands to test; all bands with an entry when empty.
    #[serde(default)]
    pub bands: Vec<String>,
    pub missing: MissingBandPolicy,
}

impl Threshold {
    pub fn new(thresholds: BTreeMap<String, Bounds>, missing: MissingBandPolicy) -> Self {
        Self {
            common: ScoreCommon::default(),
            thresholds,
            bands: Vec::new(),
            missing,
        }
    }

    pub fn tested_bands(&self) -> Vec<&str> {
        if self.bands.is_empty() {
            self.thresholds.keys().map(String::as_str).collect()
        } else {
            self.bands.iter().map(String::as_str).collect()
        }
    }
}

impl Score for Threshold {
    fn default_name(&self) -> &'static str {
        "score-thres"
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        let tested = self.tested_bands();
        if tested.is_empty() {
            return Err(BapError::InvalidScore {
                name: self.name().to_string(),
                reason: "no band to test".into(),
            });
        }
        if self.missing == MissingBandPolicy::Fail {
            if let Some(band) = tested.iter().find(|b| !self.thresholds.contains_key(**b)) {
                return Err(BapError::InvalidScore {
                    name: self.name().to_string(),
                    reason: format!("no threshold for band '{band}'"),
                });
            }
        }
        Ok(())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for Threshold {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let shape = ctx.image_shape(image);
        let tested = self.tested_bands();
        let mut passed = Array2::<f32>::zeros(shape);
        if tested.is_empty() {
            return Ok(Band::new(passed));
        }

        for name in &tested {
            let Some(bounds) = self.thresholds.get(*name) else {
                match self.missing {
                    MissingBandPolicy::PassThrough => passed += 1.0,
                    MissingBandPolicy::Fail => {
                        return Err(BapError::InvalidScore {
                            name: self.name().to_string(),
                            reason: format!("no threshold for band '{name}'"),
                        })
                    }
                }
                continue;
            };
            let Some(band) = image.band(name) else {
                match self.missing {
                    MissingBandPolicy::PassThrough => passed += 1.0,
                    MissingBandPolicy::Fail => {
                        return Err(BapError::MissingBand {
                            band: name.to_string(),
                            image: image.id.clone(),
                        })
                    }
                }
                continue;
            };
            Zip::from(&mut passed)
                .and(&band.data)
                .and(&band.mask)
                .for_each(|p, &v, &valid| {
                    if valid && bounds.passes(f64::from(v)) {
                        *p += 1.0;
                    }
                });
        }

        let count = tested.len() as f32;
        Ok(Band::new(passed.mapv(|p| p / count)))
    }
}
