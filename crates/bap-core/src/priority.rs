//! Which collections count as "best available" for a given year.

use chrono::{Datelike, Local};

use crate::catalog::SensorId::{self, *};
use crate::consts::{FIRST_PRIORITY_YEAR, SLC_OFF_FIRST_YEAR};
use crate::error::{BapError, Result};

/// First year of each period. The last period is open-ended.
const BREAKS: [i32; 11] = [1972, 1974, 1976, 1978, 1982, 1983, 1994, 1999, 2003, 2012, 2013];

const PERIODS: [&[SensorId]; 11] = [
    &[Landsat1],
    &[Landsat2, Landsat1],
    &[Landsat3, Landsat2, Landsat1],
    &[Landsat3, Landsat2],
    &[Landsat4Sr, Landsat4Toa, Landsat3, Landsat2],
    &[Landsat5Sr, Landsat5Toa, Landsat4Sr, Landsat4Toa],
    &[Landsat5Sr, Landsat5Toa],
    &[Landsat7Sr, Landsat7Toa, Landsat5Sr, Landsat5Toa],
    &[Landsat5Sr, Landsat5Toa, Landsat7Sr, Landsat7Toa],
    &[Landsat8Sr, Landsat8Toa, Landsat7Sr, Landsat7Toa, Landsat5Sr, Landsat5Toa],
    &[Landsat8Sr, Landsat8Toa, Landsat7Sr, Landsat7Toa],
];

/// Last year the priority table answers for.
pub fn last_supported_year() -> i32 {
    Local::now().year()
}

/// Ordered sensors for `year`, best first.
pub fn satellites_for(year: i32) -> Result<&'static [SensorId]> {
    let last = last_supported_year();
    if year < FIRST_PRIORITY_YEAR || year > last {
        return Err(BapError::UnsupportedYear {
            year,
            first: FIRST_PRIORITY_YEAR,
            last,
        });
    }
    let period = BREAKS.iter().rposition(|&b| year >= b).unwrap_or(0);
    Ok(PERIODS[period])
}

/// Position of `sensor` in the priority list of `year`.
pub fn priority_index(year: i32, sensor: SensorId) -> Option<usize> {
    satellites_for(year)
        .ok()?
        .iter()
        .position(|&s| s == sensor)
}

/// Landsat 7 scenes after the scan line corrector failure.
pub fn is_slc_off(sensor: SensorId, year: i32) -> bool {
    matches!(sensor, Landsat7Toa | Landsat7Sr) && year >= SLC_OFF_FIRST_YEAR
}

/// Union of the priority lists over `years`, keeping first-seen order.
pub fn satellites_for_range(years: impl IntoIterator<Item = i32>) -> Result<Vec<SensorId>> {
    let mut sensors: Vec<SensorId> = Vec::new();
    for year in years {
        for &sensor in satellites_for(year)? {
            if !sensors.contains(&sensor) {
                sensors.push(sensor);
            }
        }
    }
    Ok(sensors)
}
