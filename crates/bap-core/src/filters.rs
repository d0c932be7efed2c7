//! Collection-level filters dropping whole images by metadata.

use serde::{Deserialize, Serialize};

use crate::catalog::SensorDescriptor;
use crate::image::Image;
use crate::query::Query;
use crate::scores::mask_percent::DEFAULT_MASK_PERCENT_NAME;

fn default_cloud_percent() -> f64 {
    70.0
}

fn default_mask_percent() -> f64 {
    0.7
}

fn default_mask_prop() -> String {
    DEFAULT_MASK_PERCENT_NAME.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FilterConfig {
    /// Drop scenes whose cloud cover is `percent` or more.
    CloudCover {
        #[serde(default = "default_cloud_percent")]
        percent: f64,
    },
    /// Keep images whose mask-percent score property exceeds `percent`.
    /// Runs after scoring.
    MaskCover {
        #[serde(default = "default_mask_percent")]
        percent: f64,
        #[serde(default = "default_mask_prop")]
        prop: String,
    },
}

impl FilterConfig {
    pub fn name(&self) -> &'static str {
        match self {
            FilterConfig::CloudCover { .. } => "CloudCover",
            FilterConfig::MaskCover { .. } => "MaskCover",
        }
    }

    /// Whether the filter depends on score output.
    pub fn is_post_score(&self) -> bool {
        matches!(self, FilterConfig::MaskCover { .. })
    }

    pub fn keep(&self, image: &Image, sensor: &SensorDescriptor) -> bool {
        match self {
            FilterConfig::CloudCover { percent } => match sensor.cloud_cover {
                Some(prop) => image.property(prop).is_none_or(|cover| cover < *percent),
                None => true,
            },
            FilterConfig::MaskCover { percent, prop } => {
                image.property(prop).is_none_or(|value| value > *percent)
            }
        }
    }

    /// Append this filter as a stage of `query`.
    pub fn apply(&self, query: Query, sensor: &'static SensorDescriptor) -> Query {
        let filter = self.clone();
        query.filter(format!("filter {}", self.name()), move |img| filter.keep(img, sensor))
    }
}
