#[allow(dead_code)]
mod common;

use std::collections::HashSet;

use bap_core::catalog::{
    common_bands, descriptor_for, Family, QaEncoding, SensorId, GREEN, NIR, RED, SWIR,
};
use bap_core::masks::{flagged, qa_mask, MaskConfig, MaskOption};
use bap_core::priority::{
    is_slc_off, last_supported_year, priority_index, satellites_for, satellites_for_range,
};

use common::{band, date, l8_scene, QA_CLOUD};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[test]
fn test_descriptor_lookup() {
    let l8 = descriptor_for(SensorId::Landsat8Sr);
    assert_eq!(l8.id, SensorId::Landsat8Sr);
    assert_eq!(l8.family, Family::Landsat);
    assert_eq!(l8.band(NIR).unwrap().native, "B5");
    assert_eq!(l8.max_of(RED), Some(10_000.0));
    assert_eq!(l8.cloud_cover, Some("CLOUD_COVER"));
}

#[test]
fn test_collection_codes_are_unique() {
    let codes: HashSet<u8> = SensorId::ALL.iter().map(|s| descriptor_for(*s).code).collect();
    assert_eq!(codes.len(), SensorId::ALL.len());
}

#[test]
fn test_derived_descriptors_share_bands() {
    let l5 = descriptor_for(SensorId::Landsat5Sr);
    let l7 = descriptor_for(SensorId::Landsat7Sr);
    assert_eq!(l5.bands, l7.bands);
    assert_ne!(l5.code, l7.code);
    assert_eq!(l7.last_year, None);
    assert_eq!(l5.last_year, Some(2013));
}

#[test]
fn test_sensor_id_parse() {
    assert_eq!("L8SR".parse::<SensorId>().unwrap(), SensorId::Landsat8Sr);
    assert_eq!("l8sr".parse::<SensorId>().unwrap(), SensorId::Landsat8Sr);
    assert_eq!(
        "COPERNICUS/S2".parse::<SensorId>().unwrap(),
        SensorId::Sentinel2Toa
    );
    assert!("LANDSAT/LC09".parse::<SensorId>().is_err());
}

#[test]
fn test_sensor_id_display_round_trip() {
    for id in SensorId::ALL {
        assert_eq!(id.to_string().parse::<SensorId>().unwrap(), id);
    }
}

#[test]
fn test_valid_in() {
    let l5 = descriptor_for(SensorId::Landsat5Toa);
    assert!(l5.valid_in(1984));
    assert!(l5.valid_in(2013));
    assert!(!l5.valid_in(2014));
    assert!(!l5.valid_in(1983));
}

#[test]
fn test_common_bands() {
    let bands = common_bands(&[SensorId::Landsat1, SensorId::Landsat8Sr]);
    assert_eq!(bands, vec![GREEN, RED, NIR, SWIR]);
}

// ---------------------------------------------------------------------------
// Priority table
// ---------------------------------------------------------------------------

#[test]
fn test_satellites_for_year() {
    assert_eq!(satellites_for(1972).unwrap(), &[SensorId::Landsat1]);
    assert_eq!(
        satellites_for(2015).unwrap(),
        &[
            SensorId::Landsat8Sr,
            SensorId::Landsat8Toa,
            SensorId::Landsat7Sr,
            SensorId::Landsat7Toa,
        ]
    );
    assert_eq!(satellites_for(2012).unwrap().len(), 6);
}

#[test]
fn test_satellites_for_unsupported_year() {
    assert!(satellites_for(1971).is_err());
    assert!(satellites_for(last_supported_year() + 1).is_err());
    assert!(satellites_for(last_supported_year()).is_ok());
}

#[test]
fn test_priority_index() {
    assert_eq!(priority_index(2015, SensorId::Landsat8Sr), Some(0));
    assert_eq!(priority_index(2015, SensorId::Landsat7Sr), Some(2));
    assert_eq!(priority_index(2015, SensorId::Landsat5Sr), None);
    assert_eq!(priority_index(1900, SensorId::Landsat1), None);
}

#[test]
fn test_slc_off() {
    assert!(is_slc_off(SensorId::Landsat7Sr, 2003));
    assert!(is_slc_off(SensorId::Landsat7Toa, 2010));
    assert!(!is_slc_off(SensorId::Landsat7Sr, 2002));
    assert!(!is_slc_off(SensorId::Landsat5Sr, 2010));
}

#[test]
fn test_satellites_for_range_keeps_first_seen_order() {
    let sensors = satellites_for_range(2011..=2013).unwrap();
    assert_eq!(
        sensors,
        vec![
            SensorId::Landsat5Sr,
            SensorId::Landsat5Toa,
            SensorId::Landsat7Sr,
            SensorId::Landsat7Toa,
            SensorId::Landsat8Sr,
            SensorId::Landsat8Toa,
        ]
    );
}

// ---------------------------------------------------------------------------
// Quality masks
// ---------------------------------------------------------------------------

#[test]
fn test_flagged_bits() {
    let qa = QaEncoding::PIXEL_QA;
    assert!(flagged(&qa, QA_CLOUD, &[MaskOption::Cloud]));
    assert!(!flagged(&qa, 8.0, &[MaskOption::Cloud]));
    assert!(flagged(&qa, 8.0, &[MaskOption::Shadow]));
    // Fill is flagged whatever the options.
    assert!(flagged(&qa, 1.0, &[]));
    assert!(!flagged(&qa, 2.0, &[MaskOption::Cloud, MaskOption::Shadow, MaskOption::Snow]));
}

#[test]
fn test_flagged_classes() {
    let fmask = QaEncoding::FMASK;
    assert!(flagged(&fmask, 5.0, &[MaskOption::Cloud]));
    assert!(!flagged(&fmask, 5.0, &[MaskOption::Snow]));
    assert!(flagged(&fmask, 255.0, &[]));
    assert!(!flagged(&fmask, 0.0, &[MaskOption::Cloud, MaskOption::Shadow, MaskOption::Snow]));
}

#[test]
fn test_qa_mask_keeps_clear_pixels() {
    let qa = band((2, 2), &[0.0, QA_CLOUD, 8.0, 0.0]);
    let keep = qa_mask(&QaEncoding::PIXEL_QA, &qa.data, &[MaskOption::Cloud]);
    assert_eq!(keep.iter().copied().collect::<Vec<_>>(), vec![true, false, true, true]);
}

#[test]
fn test_mask_config_applies_to_every_band() {
    let mut image = l8_scene("a", date(2020, 7, 1), (2, 2), 1000.0, &[0.0, QA_CLOUD, 8.0, 16.0]);
    MaskConfig::default().apply(&mut image, descriptor_for(SensorId::Landsat8Sr));
    let b2 = image.band("B2").unwrap();
    assert_eq!(b2.get(0, 0), Some(1000.0));
    assert_eq!(b2.get(0, 1), None);
    assert_eq!(b2.get(1, 0), None);
    assert_eq!(b2.get(1, 1), None);
}

#[test]
fn test_mask_without_qa_band_passes_through() {
    let mut image = l8_scene("a", date(2020, 7, 1), (1, 2), 1000.0, &[QA_CLOUD, QA_CLOUD]);
    image.remove_band("pixel_qa");
    MaskConfig::default().apply(&mut image, descriptor_for(SensorId::Landsat8Sr));
    assert_eq!(image.band("B2").unwrap().valid_count(), 2);
}
