use chrono::{Datelike, NaiveDate};
use tracing::debug;

use super::config::BapConfig;
use crate::catalog::SensorDescriptor;
use crate::consts::{COL_ID_BAND, DATE_BAND, YEAR_PROPERTY};
use crate::error::{BapError, Result};
use crate::image::{Band, Grid, Image, Rect};
use crate::indices::IndexKind;

/// Zero-valued stand-in for an empty collection, in the sensor's native
/// band schema.
pub(super) fn native_proxy(
    sensor: &SensorDescriptor,
    year: i32,
    date: NaiveDate,
    grid: Grid,
    footprint: Rect,
) -> Image {
    let mut proxy = Image::new(format!("proxy-{}-{year}", sensor.short_name), date, footprint);
    for spec in &sensor.bands {
        proxy.add_band(spec.native, Band::constant(grid.shape(), 0.0));
    }
    proxy.sensor = Some(sensor.id);
    proxy.proxy = true;
    proxy
}

/// Zero-valued stand-in for a collection emptied by post-score filters, in
/// the schema the scoring stages produce.
pub(super) fn scored_proxy(
    sensor: &SensorDescriptor,
    year: i32,
    date: NaiveDate,
    grid: Grid,
    footprint: Rect,
    indices: &[IndexKind],
    score_names: &[String],
) -> Image {
    let shape = grid.shape();
    let canonical = sensor.canonical_bands();
    let mut proxy = Image::new(format!("proxy-{}-{year}", sensor.short_name), date, footprint);
    for band in &canonical {
        proxy.add_band(*band, Band::constant(shape, 0.0));
    }
    for index in indices {
        if index.inputs().iter().all(|b| canonical.contains(b)) {
            proxy.add_band(index.band_name(), Band::constant(shape, 0.0));
        }
    }
    for name in score_names {
        proxy.add_band(name.as_str(), Band::constant(shape, 0.0));
    }
    proxy.proxy = true;
    tag(proxy, sensor, year)
}

pub(super) fn tag(mut image: Image, sensor: &SensorDescriptor, year: i32) -> Image {
    image.sensor = Some(sensor.id);
    image.year_bucket = Some(year);
    image.set_property(YEAR_PROPERTY, f64::from(year));
    image
}

/// Keep the sensor's bands and give them their canonical names.
pub(super) fn rename_to_canonical(mut image: Image, sensor: &SensorDescriptor) -> Image {
    let natives: Vec<&str> = sensor.bands.iter().map(|b| b.native).collect();
    image.retain_bands(&natives);
    for spec in &sensor.bands {
        image.rename_band(spec.native, spec.canonical);
    }
    image
}

/// Linearly map each reflectance band from the sensor's range to the
/// target's.
pub(super) fn rescale_to_target(mut image: Image, sensor: &SensorDescriptor, target: &SensorDescriptor) -> Image {
    for spec in sensor.bands.iter().filter(|b| b.rescale) {
        let Some(goal) = target.band(spec.canonical).filter(|b| b.rescale) else {
            continue;
        };
        if spec.range == goal.range {
            continue;
        }
        let (lo, hi) = spec.range;
        let (tlo, thi) = goal.range;
        if let Some(band) = image.band_mut(spec.canonical) {
            band.data.mapv_inplace(|v| ((f64::from(v) - lo) / (hi - lo) * (thi - tlo) + tlo) as f32);
        }
    }
    image
}

/// Zero every score band of a proxy so it never outranks real pixels.
pub(super) fn zero_proxy_scores(mut image: Image, score_names: &[String]) -> Image {
    if !image.proxy {
        return image;
    }
    let Some(shape) = image.shape() else {
        return image;
    };
    for name in score_names {
        image.add_band(name.as_str(), Band::constant(shape, 0.0));
    }
    image
}

pub(super) fn mask_by_first_band(mut image: Image) -> Image {
    if let Some(mask) = image.mask().cloned() {
        image.update_mask(&mask);
    }
    image
}

/// Constant collection-code and acquisition-date bands.
pub(super) fn add_provenance_bands(mut image: Image, sensor: &SensorDescriptor) -> Image {
    let Some(shape) = image.shape() else {
        return image;
    };
    let mask = image.mask().cloned();
    let mut col_id = Band::constant(shape, f32::from(sensor.code));
    let mut date = Band::constant(shape, date_to_band_value(image.date));
    if let Some(mask) = mask {
        col_id.update_mask(&mask);
        date.update_mask(&mask);
    }
    image.add_band(COL_ID_BAND, col_id);
    image.add_band(DATE_BAND, date);
    image
}

pub fn date_to_band_value(date: NaiveDate) -> f32 {
    date.num_days_from_ce() as f32
}

pub fn date_from_band_value(value: f32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(value.round() as i32)
}

/// Add the summed score band; missing score bands count as zero.
pub(super) fn sum_scores(mut image: Image, score_names: &[String], score_band: &str) -> Image {
    let Some(shape) = image.shape() else {
        return image;
    };
    let mut total = Band::constant(shape, 0.0);
    for name in score_names {
        if let Some(band) = image.band(name) {
            total.data += &band.unmask().data;
        }
    }
    if let Some(mask) = image.mask() {
        total.update_mask(mask);
    }
    image.add_band(score_band, total);
    image
}

/// Reduce a pool to one comparable schema and add the summed score.
///
/// Kept bands, in order: spectral bands common to every image, the
/// collection-code and date bands, the individual scores (when requested),
/// the common index bands and the summed score.
pub(crate) fn harmonize_pool(images: Vec<Image>, score_names: &[String], config: &BapConfig) -> Result<Vec<Image>> {
    if images.is_empty() {
        return Err(BapError::EmptyCollection);
    }
    let images: Vec<Image> = images
        .into_iter()
        .map(|img| sum_scores(img, score_names, &config.score_band))
        .collect();

    let index_names: Vec<&str> = config.indices.iter().map(|i| i.band_name()).collect();
    let special = |name: &str| {
        name == COL_ID_BAND
            || name == DATE_BAND
            || name == config.score_band
            || score_names.iter().any(|s| s == name)
            || index_names.contains(&name)
    };
    let common = |name: &str| images.iter().all(|img| img.has_band(name));

    let mut selected: Vec<String> = images[0]
        .band_names()
        .into_iter()
        .filter(|n| !special(*n) && common(*n))
        .map(str::to_string)
        .collect();
    selected.push(COL_ID_BAND.to_string());
    selected.push(DATE_BAND.to_string());
    if config.keep_individual_scores {
        selected.extend(score_names.iter().cloned());
    }
    selected.extend(index_names.iter().copied().filter(|n| common(*n)).map(str::to_string));
    selected.push(config.score_band.clone());
    debug!(bands = ?selected, images = images.len(), "harmonized band schema");

    Ok(images
        .into_iter()
        .map(|mut img| {
            img.retain_bands(&selected);
            img
        })
        .collect())
}
