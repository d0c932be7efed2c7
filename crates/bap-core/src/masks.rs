//! Cloud, shadow and snow masking from each sensor's quality band.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{QaEncoding, SensorDescriptor};
use crate::image::Image;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskOption {
    Cloud,
    Shadow,
    Snow,
}

fn default_options() -> Vec<MaskOption> {
    vec![MaskOption::Cloud, MaskOption::Shadow, MaskOption::Snow]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MaskConfig {
    Clouds {
        #[serde(default = "default_options")]
        options: Vec<MaskOption>,
    },
}

impl Default for MaskConfig {
    fn default() -> Self {
        MaskConfig::Clouds {
            options: default_options(),
        }
    }
}

impl MaskConfig {
    pub fn name(&self) -> &'static str {
        match self {
            MaskConfig::Clouds { .. } => "Clouds",
        }
    }

    /// Mask `image` in place using the sensor's QA encoding. Sensors without
    /// an encoding, or images without the QA band, pass through.
    pub fn apply(&self, image: &mut Image, sensor: &SensorDescriptor) {
        match self {
            MaskConfig::Clouds { options } => {
                let Some(encoding) = sensor.qa else {
                    return;
                };
                let Some(qa) = image.band(encoding.band()) else {
                    debug!(image = %image.id, band = encoding.band(), "QA band missing, mask skipped");
                    return;
                };
                let keep = qa_mask(&encoding, &qa.data, options);
                image.update_mask(&keep);
            }
        }
    }
}

/// Whether a QA value marks the pixel as unusable for the given options.
/// Fill values are always flagged.
pub fn flagged(encoding: &QaEncoding, value: f32, options: &[MaskOption]) -> bool {
    match encoding {
        QaEncoding::Classes {
            fill,
            cloud,
            shadow,
            snow,
            ..
        } => {
            let class = value.round() as u16;
            if fill.contains(&class) {
                return true;
            }
            options.iter().any(|opt| match opt {
                MaskOption::Cloud => cloud.contains(&class),
                MaskOption::Shadow => shadow.contains(&class),
                MaskOption::Snow => snow.contains(&class),
            })
        }
        QaEncoding::Bits {
            fill,
            cloud,
            shadow,
            snow,
            ..
        } => {
            let bits = value.round() as u32;
            let any_set = |positions: &[u32]| positions.iter().any(|&b| bits & (1 << b) != 0);
            if any_set(fill) {
                return true;
            }
            options.iter().any(|opt| match opt {
                MaskOption::Cloud => any_set(cloud),
                MaskOption::Shadow => any_set(shadow),
                MaskOption::Snow => any_set(snow),
            })
        }
    }
}

/// Boolean keep-mask of a QA band.
pub fn qa_mask(encoding: &QaEncoding, qa: &Array2<f32>, options: &[MaskOption]) -> Array2<bool> {
    qa.mapv(|v| !flagged(encoding, v, options))
}
