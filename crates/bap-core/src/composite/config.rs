use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::SensorId;
use crate::consts::{DEFAULT_REDUCE_SET, DEFAULT_SCORE_BAND};
use crate::error::{BapError, Result};
use crate::filters::FilterConfig;
use crate::indices::IndexKind;
use crate::keyed;
use crate::masks::MaskConfig;
use crate::priority::last_supported_year;
use crate::retry::RetryPolicy;
use crate::scores::{CloudDist, Doy, MaskPercent, Satellite, ScoreConfig};
use crate::season::Season;

fn default_year() -> i32 {
    last_supported_year() - 1
}

fn default_masks() -> Vec<MaskConfig> {
    vec![MaskConfig::default()]
}

fn default_target() -> SensorId {
    SensorId::Landsat8Sr
}

fn default_score_band() -> String {
    DEFAULT_SCORE_BAND.to_string()
}

fn default_top_k() -> usize {
    DEFAULT_REDUCE_SET
}

/// Statistic applied to the best-scored stack of each pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Mean,
    Median,
    Mode,
    /// Mean of the values between the 50th and 90th percentiles.
    IntervalMean,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::Mean => "mean",
            Reducer::Median => "median",
            Reducer::Mode => "mode",
            Reducer::IntervalMean => "interval_mean",
        };
        f.write_str(name)
    }
}

impl FromStr for Reducer {
    type Err = BapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Reducer::Mean),
            "median" => Ok(Reducer::Median),
            "mode" => Ok(Reducer::Mode),
            "interval_mean" | "intervalmean" => Ok(Reducer::IntervalMean),
            _ => Err(BapError::UnknownReducer(s.to_string())),
        }
    }
}

/// How the candidate pool collapses into one image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selection {
    /// Per pixel, the candidate with the highest score.
    #[default]
    QualityMosaic,
    /// Per pixel, a statistic over the `top_k` best-scored candidates.
    Reduce {
        reducer: Reducer,
        #[serde(default = "default_top_k")]
        top_k: usize,
    },
}

/// A complete composite request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BapConfig {
    /// Central season year.
    #[serde(default = "default_year")]
    pub year: i32,
    /// Seasons gathered before and after `year`.
    #[serde(default)]
    pub range: (u32, u32),
    #[serde(default)]
    pub season: Season,
    #[serde(default)]
    pub scores: Vec<ScoreConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default = "default_masks")]
    pub masks: Vec<MaskConfig>,
    /// Schema every collection is rescaled to.
    #[serde(default = "default_target")]
    pub target: SensorId,
    /// Explicit collections; the yearly priority lists when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensors: Option<Vec<SensorId>>,
    #[serde(default)]
    pub indices: Vec<IndexKind>,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_score_band")]
    pub score_band: String,
    /// Keep every score band next to the summed one.
    #[serde(default)]
    pub keep_individual_scores: bool,
}

impl Default for BapConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
            range: (0, 0),
            season: Season::default(),
            scores: vec![
                ScoreConfig::Doy(Doy::default()),
                ScoreConfig::Satellite(Satellite::default()),
                ScoreConfig::MaskPercent(MaskPercent::default()),
                ScoreConfig::CloudDist(CloudDist::default()),
            ],
            filters: vec![FilterConfig::CloudCover { percent: 70.0 }],
            masks: default_masks(),
            target: default_target(),
            sensors: None,
            indices: Vec::new(),
            selection: Selection::default(),
            retry: RetryPolicy::default(),
            score_band: default_score_band(),
            keep_individual_scores: false,
        }
    }
}

impl BapConfig {
    pub fn with_year(year: i32) -> Self {
        Self {
            year,
            ..Self::default()
        }
    }

    /// Years gathered, `year - before ..= year + after`.
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        let (before, after) = self.range;
        (self.year - before as i32)..=(self.year + after as i32)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Self-describing form written into provenance.
    pub fn to_keyed(&self) -> Result<Value> {
        Ok(keyed::encode(&serde_json::to_value(self)?))
    }

    pub fn from_keyed(value: &Value) -> Result<Self> {
        Ok(serde_json::from_value(keyed::decode(value)?)?)
    }
}
