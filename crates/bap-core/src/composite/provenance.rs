use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::image::Image;
use crate::season::DateRange;

/// Where a composite came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Start of the main year's season window.
    pub time_start: NaiveDate,
    pub version: String,
    /// Season window of every gathered year.
    pub seasons: BTreeMap<i32, DateRange>,
    /// Real (non-proxy) candidates per collection id.
    pub image_counts: BTreeMap<String, usize>,
    /// `"<collection>/<image id>"` of every real candidate.
    pub used_images: Vec<String>,
    /// The request in keyed form.
    pub parameters: Value,
}

impl Provenance {
    pub fn total_images(&self) -> usize {
        self.image_counts.values().sum()
    }

    /// Season properties as `BAP_SEASON_<year>` -> `"start to end"`.
    pub fn season_properties(&self) -> BTreeMap<String, String> {
        self.seasons
            .iter()
            .map(|(year, range)| (format!("BAP_SEASON_{year}"), range.to_string()))
            .collect()
    }
}

/// Output of [`Bap::composite`](super::Bap::composite).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    pub image: Image,
    pub provenance: Provenance,
}
