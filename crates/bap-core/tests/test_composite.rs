#[allow(dead_code)]
mod common;

use std::sync::{Arc, Mutex};

use bap_core::backend::{Backend, InMemoryBackend};
use bap_core::catalog::SensorId;
use bap_core::composite::{
    date_from_band_value, date_to_band_value, quality_mosaic, reduce_pool, Bap, BapConfig,
    CompositeStage, ProgressReporter, Reducer, Selection,
};
use bap_core::error::BapError;
use bap_core::filters::FilterConfig;
use bap_core::image::{Band, Image};
use bap_core::retry::RetryPolicy;
use bap_core::scores::{Doy, MaskPercent, ScoreConfig};
use bap_core::season::Season;

use common::{constant_image, date, grid, l8_backend, l8_scene, QA_CLOUD};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn l8_config(year: i32) -> BapConfig {
    BapConfig {
        season: Season::growing_north(),
        sensors: Some(vec![SensorId::Landsat8Sr]),
        retry: RetryPolicy::new(1, 0),
        ..BapConfig::with_year(year)
    }
}

fn candidate(id: &str, on: chrono::NaiveDate, value: f32, score: f32) -> Image {
    constant_image(id, on, (1, 1), &[("blue", value), ("score", score)])
}

fn pixel(image: &Image, band: &str, row: usize, col: usize) -> Option<f32> {
    image.band(band).and_then(|b| b.get(row, col))
}

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<CompositeStage>>,
    advances: Mutex<Vec<usize>>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: CompositeStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }

    fn advance(&self, items_done: usize) {
        self.advances.lock().unwrap().push(items_done);
    }
}

// ---------------------------------------------------------------------------
// Quality mosaic
// ---------------------------------------------------------------------------

#[test]
fn test_quality_mosaic_picks_highest_score() {
    let pool = vec![
        candidate("a", date(2020, 7, 1), 10.0, 0.3),
        candidate("b", date(2020, 7, 2), 20.0, 0.9),
    ];
    let out = quality_mosaic(&pool, "score").unwrap();
    assert_eq!(pixel(&out, "blue", 0, 0), Some(20.0));
    assert_eq!(pixel(&out, "score", 0, 0), Some(0.9));
}

#[test]
fn test_quality_mosaic_tie_prefers_earlier_date() {
    let pool = vec![
        candidate("late", date(2020, 7, 20), 20.0, 0.5),
        candidate("early", date(2020, 7, 10), 10.0, 0.5),
    ];
    let out = quality_mosaic(&pool, "score").unwrap();
    assert_eq!(pixel(&out, "blue", 0, 0), Some(10.0));
}

#[test]
fn test_quality_mosaic_tie_same_date_keeps_pool_order() {
    let pool = vec![
        candidate("first", date(2020, 7, 10), 10.0, 0.5),
        candidate("second", date(2020, 7, 10), 20.0, 0.5),
    ];
    let out = quality_mosaic(&pool, "score").unwrap();
    assert_eq!(pixel(&out, "blue", 0, 0), Some(10.0));
}

#[test]
fn test_quality_mosaic_per_pixel() {
    let mut a = constant_image("a", date(2020, 7, 1), (1, 2), &[("blue", 1.0)]);
    a.add_band("score", common::band((1, 2), &[0.9, 0.1]));
    let mut b = constant_image("b", date(2020, 7, 2), (1, 2), &[("blue", 2.0)]);
    b.add_band("score", common::band((1, 2), &[0.2, 0.8]));
    let out = quality_mosaic(&[a, b], "score").unwrap();
    assert_eq!(pixel(&out, "blue", 0, 0), Some(1.0));
    assert_eq!(pixel(&out, "blue", 0, 1), Some(2.0));
}

#[test]
fn test_quality_mosaic_masked_everywhere_stays_masked() {
    let mut a = candidate("a", date(2020, 7, 1), 10.0, 0.3);
    a.add_band("score", Band::masked((1, 1)));
    let out = quality_mosaic(&[a], "score").unwrap();
    assert_eq!(pixel(&out, "blue", 0, 0), None);
}

#[test]
fn test_quality_mosaic_errors() {
    assert!(matches!(quality_mosaic(&[], "score"), Err(BapError::EmptyCollection)));
    let pool = vec![candidate("a", date(2020, 7, 1), 10.0, 0.3)];
    assert!(matches!(
        quality_mosaic(&pool, "quality"),
        Err(BapError::MissingBand { .. })
    ));
}

// ---------------------------------------------------------------------------
// Statistical reduction
// ---------------------------------------------------------------------------

fn ranked_pool() -> Vec<Image> {
    let scores = [0.1, 0.9, 0.5, 0.7, 0.3];
    scores
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let mut img = candidate(&format!("img{i}"), date(2020, 7, 1), (i + 1) as f32, s);
            img.add_band("col_id", Band::constant((1, 1), i as f32));
            img
        })
        .collect()
}

#[test]
fn test_reduce_mean_of_top_three() {
    let out = reduce_pool(&ranked_pool(), "score", Reducer::Mean, 3).unwrap();
    // Scores 0.9, 0.7 and 0.5 carry values 2, 4 and 3.
    assert!((pixel(&out, "blue", 0, 0).unwrap() - 3.0).abs() < 1e-6);
}

#[test]
fn test_reduce_median_of_top_three() {
    let out = reduce_pool(&ranked_pool(), "score", Reducer::Median, 3).unwrap();
    assert!((pixel(&out, "blue", 0, 0).unwrap() - 3.0).abs() < 1e-6);
}

#[test]
fn test_reduce_takes_col_id_from_best() {
    let out = reduce_pool(&ranked_pool(), "score", Reducer::Mean, 3).unwrap();
    assert_eq!(pixel(&out, "col_id", 0, 0), Some(1.0));
}

#[test]
fn test_reduce_ties_follow_mosaic_order() {
    let tied = |id: &str, on, value: f32, code: f32| {
        let mut img = candidate(id, on, value, 0.5);
        img.add_band("col_id", Band::constant((1, 1), code));
        img
    };
    let pool = vec![
        tied("late", date(2020, 7, 20), 30.0, 3.0),
        tied("first", date(2020, 7, 10), 10.0, 1.0),
        tied("second", date(2020, 7, 10), 20.0, 2.0),
    ];
    let out = reduce_pool(&pool, "score", Reducer::Mean, 2).unwrap();
    assert_eq!(pixel(&out, "col_id", 0, 0), Some(1.0));
    assert!((pixel(&out, "blue", 0, 0).unwrap() - 15.0).abs() < 1e-6);

    let mosaic = quality_mosaic(&pool, "score").unwrap();
    assert_eq!(pixel(&mosaic, "col_id", 0, 0), Some(1.0));
}

#[test]
fn test_reduce_top_k_larger_than_pool() {
    let out = reduce_pool(&ranked_pool(), "score", Reducer::Mean, 50).unwrap();
    assert!((pixel(&out, "blue", 0, 0).unwrap() - 3.0).abs() < 1e-6);
}

#[test]
fn test_reducer_parse() {
    assert_eq!("interval_mean".parse::<Reducer>().unwrap(), Reducer::IntervalMean);
    assert_eq!(Reducer::Median.to_string(), "median");
    assert!("average".parse::<Reducer>().is_err());
}

// ---------------------------------------------------------------------------
// Date band encoding
// ---------------------------------------------------------------------------

#[test]
fn test_date_band_value_is_exact() {
    for d in [date(1972, 7, 23), date(2000, 2, 29), date(2024, 12, 31)] {
        assert_eq!(date_from_band_value(date_to_band_value(d)), Some(d));
    }
    assert_eq!(date_to_band_value(date(2020, 7, 2)) - date_to_band_value(date(2020, 7, 1)), 1.0);
}

// ---------------------------------------------------------------------------
// Request validation
// ---------------------------------------------------------------------------

#[test]
fn test_bap_rejects_unsupported_year() {
    assert!(matches!(
        Bap::new(BapConfig::with_year(1900)),
        Err(BapError::UnsupportedYear { .. })
    ));
    let mut config = BapConfig::with_year(1972);
    config.range = (1, 0);
    assert!(Bap::new(config).is_err());
}

#[test]
fn test_bap_rejects_empty_sensor_list() {
    let config = BapConfig {
        sensors: Some(Vec::new()),
        ..BapConfig::with_year(2020)
    };
    assert!(matches!(Bap::new(config), Err(BapError::InvalidConfig(_))));
}

#[test]
fn test_bap_rejects_zero_top_k() {
    let config = BapConfig {
        selection: Selection::Reduce {
            reducer: Reducer::Mean,
            top_k: 0,
        },
        ..BapConfig::with_year(2020)
    };
    assert!(Bap::new(config).is_err());
}

#[test]
fn test_bap_rejects_reserved_names() {
    let config = BapConfig {
        score_band: "date".into(),
        ..BapConfig::with_year(2020)
    };
    assert!(Bap::new(config).is_err());

    let mut doy = ScoreConfig::Doy(Doy::default());
    doy.set_name("col_id");
    let config = BapConfig {
        scores: vec![doy],
        ..BapConfig::with_year(2020)
    };
    assert!(Bap::new(config).is_err());
}

#[test]
fn test_bap_mask_cover_needs_mask_percent() {
    let mut config = BapConfig::with_year(2020);
    config.filters.push(FilterConfig::MaskCover {
        percent: 0.5,
        prop: "score-maskper".into(),
    });
    assert!(Bap::new(config.clone()).is_ok());

    config.scores.retain(|s| !matches!(s, ScoreConfig::MaskPercent(_)));
    assert!(Bap::new(config).is_err());
}

#[test]
fn test_bap_renames_duplicate_scores() {
    let config = BapConfig {
        scores: vec![
            ScoreConfig::Doy(Doy::default()),
            ScoreConfig::Doy(Doy::default()),
            ScoreConfig::Doy(Doy::default()),
        ],
        ..BapConfig::with_year(2020)
    };
    let bap = Bap::new(config).unwrap();
    assert_eq!(bap.score_names(), vec!["score-doy", "score-doy_1", "score-doy_2"]);
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[test]
fn test_plan_covers_every_year_and_sensor() {
    let config = BapConfig {
        range: (1, 1),
        ..BapConfig::with_year(2020)
    };
    let bap = Bap::new(config).unwrap();
    let g = grid(2, 2);
    let plans = bap.plan(g.extent(), g).unwrap();
    assert_eq!(plans.len(), 12);
    assert_eq!(plans[0].year, 2019);
    assert_eq!(plans[0].sensor, SensorId::Landsat8Sr);
    assert_eq!(plans[11].year, 2021);
}

#[test]
fn test_explicit_sensors_are_restricted_to_their_years() {
    let config = BapConfig {
        sensors: Some(vec![SensorId::Landsat5Sr, SensorId::Landsat8Sr]),
        ..BapConfig::with_year(2020)
    };
    let bap = Bap::new(config).unwrap();
    assert_eq!(bap.sensors_for(2020).unwrap(), vec![SensorId::Landsat8Sr]);
    assert_eq!(bap.sensors_for(2010).unwrap(), vec![SensorId::Landsat5Sr]);
}

#[test]
fn test_candidate_query_is_deferred() {
    let bap = Bap::new(l8_config(2020)).unwrap();
    let backend = l8_backend(2, 2, Vec::new());
    let query = bap.candidate_query(&backend, backend.grid().extent()).unwrap();
    let lines = query.describe();
    assert!(lines[0].starts_with("union of 1"));
    assert!(lines.iter().any(|l| l.contains("score score-doy")));
    assert_eq!(lines.last().unwrap(), "collection harmonize pool");
}

// ---------------------------------------------------------------------------
// End-to-end compositing
// ---------------------------------------------------------------------------

#[test]
fn test_composite_prefers_clear_scene() {
    let clear = l8_scene("clear", date(2020, 7, 15), (2, 2), 1000.0, &[0.0; 4]);
    let cloudy = l8_scene("cloudy", date(2020, 7, 15), (2, 2), 3000.0, &[QA_CLOUD, 0.0, 0.0, 0.0]);
    let outside = l8_scene("winter", date(2020, 12, 1), (2, 2), 5000.0, &[0.0; 4]);
    let backend = l8_backend(2, 2, vec![cloudy, clear, outside]);

    let bap = Bap::new(l8_config(2020)).unwrap();
    let result = bap.composite_quiet(&backend, backend.grid().extent()).unwrap();
    let image = &result.image;

    assert_eq!(
        image.band_names(),
        vec!["blue", "green", "red", "nir", "swir", "swir2", "col_id", "date", "score"]
    );
    for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        assert_eq!(pixel(image, "blue", row, col), Some(1000.0));
        assert_eq!(pixel(image, "col_id", row, col), Some(11.0));
    }
    let d = pixel(image, "date", 0, 0).unwrap();
    assert_eq!(date_from_band_value(d), Some(date(2020, 7, 15)));

    assert_eq!(image.id, "bap-2020");
    assert_eq!(image.date, date(2020, 5, 15));
    assert_eq!(image.property("YEAR_BAP"), Some(2020.0));

    let provenance = &result.provenance;
    assert_eq!(provenance.total_images(), 2);
    assert_eq!(provenance.image_counts.get("LANDSAT/LC08/C01/T1_SR"), Some(&2));
    assert!(provenance
        .used_images
        .contains(&"LANDSAT/LC08/C01/T1_SR/clear".to_string()));
    assert_eq!(provenance.time_start, date(2020, 5, 15));
    assert_eq!(
        provenance.season_properties().get("BAP_SEASON_2020").map(String::as_str),
        Some("2020-05-15 to 2020-09-15")
    );
}

#[test]
fn test_composite_mixes_candidates_per_pixel() {
    let best = l8_scene("best", date(2020, 7, 15), (2, 2), 1000.0, &[QA_CLOUD, 0.0, 0.0, 0.0]);
    let late = l8_scene("late", date(2020, 9, 1), (2, 2), 2000.0, &[0.0; 4]);
    let backend = l8_backend(2, 2, vec![best, late]);

    let config = BapConfig {
        scores: vec![
            ScoreConfig::Doy(Doy::default()),
            ScoreConfig::MaskPercent(MaskPercent::default()),
        ],
        ..l8_config(2020)
    };
    let bap = Bap::new(config).unwrap();
    let image = bap.composite_quiet(&backend, backend.grid().extent()).unwrap().image;

    // The cloudy pixel of the best-dated scene falls back to the late one.
    assert_eq!(pixel(&image, "blue", 0, 0), Some(2000.0));
    assert_eq!(pixel(&image, "blue", 1, 1), Some(1000.0));
    let d = pixel(&image, "date", 0, 0).unwrap();
    assert_eq!(date_from_band_value(d), Some(date(2020, 9, 1)));
}

#[test]
fn test_composite_keeps_individual_scores() {
    let clear = l8_scene("clear", date(2020, 7, 15), (1, 1), 1000.0, &[0.0]);
    let backend = l8_backend(1, 1, vec![clear]);
    let config = BapConfig {
        keep_individual_scores: true,
        ..l8_config(2020)
    };
    let bap = Bap::new(config).unwrap();
    let image = bap.composite_quiet(&backend, backend.grid().extent()).unwrap().image;
    assert!((pixel(&image, "score-doy", 0, 0).unwrap() - 1.0).abs() < 1e-6);
    assert!((pixel(&image, "score-sat", 0, 0).unwrap() - 1.0).abs() < 1e-6);
    assert!((pixel(&image, "score", 0, 0).unwrap() - 4.0).abs() < 1e-5);
}

#[test]
fn test_empty_collection_becomes_proxy() {
    let backend = l8_backend(2, 2, Vec::new());
    let bap = Bap::new(l8_config(2020)).unwrap();
    let result = bap.composite_quiet(&backend, backend.grid().extent()).unwrap();

    assert_eq!(result.provenance.total_images(), 0);
    assert!(result.provenance.used_images.is_empty());
    let image = &result.image;
    assert_eq!(image.bands.len(), 9);
    assert_eq!(pixel(image, "blue", 1, 1), Some(0.0));
    assert_eq!(pixel(image, "score", 1, 1), Some(0.0));
    assert_eq!(pixel(image, "col_id", 1, 1), Some(11.0));
}

#[test]
fn test_cloud_cover_filter_falls_back_to_proxy() {
    let scene = l8_scene("a", date(2020, 7, 15), (1, 1), 1000.0, &[0.0]);
    let backend = l8_backend(1, 1, vec![scene]);
    let config = BapConfig {
        filters: vec![FilterConfig::CloudCover { percent: 5.0 }],
        ..l8_config(2020)
    };
    let bap = Bap::new(config).unwrap();
    let result = bap.composite_quiet(&backend, backend.grid().extent()).unwrap();
    assert_eq!(result.provenance.total_images(), 0);
    assert_eq!(pixel(&result.image, "blue", 0, 0), Some(0.0));
}

#[test]
fn test_mask_cover_filter_falls_back_to_scored_proxy() {
    let cloudy = l8_scene("cloudy", date(2020, 7, 15), (2, 2), 1000.0, &[QA_CLOUD, 0.0, 0.0, 0.0]);
    let backend = l8_backend(2, 2, vec![cloudy]);
    let mut config = l8_config(2020);
    config.filters.push(FilterConfig::MaskCover {
        percent: 0.9,
        prop: "score-maskper".into(),
    });
    let bap = Bap::new(config).unwrap();
    let result = bap.composite_quiet(&backend, backend.grid().extent()).unwrap();
    assert_eq!(result.provenance.total_images(), 0);
    assert_eq!(result.image.bands.len(), 9);
    assert_eq!(pixel(&result.image, "blue", 0, 0), Some(0.0));
}

#[test]
fn test_real_pixels_outrank_proxies() {
    let clear = l8_scene("clear", date(2020, 7, 15), (1, 1), 1000.0, &[0.0]);
    let backend = l8_backend(1, 1, vec![clear]);
    let config = BapConfig {
        sensors: Some(vec![SensorId::Landsat8Sr, SensorId::Landsat8Toa]),
        ..l8_config(2020)
    };
    let bap = Bap::new(config).unwrap();
    let result = bap.composite_quiet(&backend, backend.grid().extent()).unwrap();
    assert_eq!(pixel(&result.image, "blue", 0, 0), Some(1000.0));
    assert_eq!(result.provenance.image_counts.get("LANDSAT/LC08/C01/T1_TOA"), Some(&0));
}

#[test]
fn test_slc_off_zeroes_mask_percent() {
    let mut scene = constant_image(
        "l7",
        date(2010, 7, 15),
        (1, 1),
        &[
            ("B1", 500.0),
            ("B2", 500.0),
            ("B3", 500.0),
            ("B4", 500.0),
            ("B5", 500.0),
            ("B7", 500.0),
        ],
    );
    scene.set_property("CLOUD_COVER", 10.0);
    let mut backend = InMemoryBackend::new(grid(1, 1));
    backend.add_image(SensorId::Landsat7Sr, scene).unwrap();

    let config = BapConfig {
        sensors: Some(vec![SensorId::Landsat7Sr]),
        keep_individual_scores: true,
        ..l8_config(2010)
    };
    let bap = Bap::new(config).unwrap();
    let image = bap.composite_quiet(&backend, backend.grid().extent()).unwrap().image;
    assert_eq!(pixel(&image, "score-maskper", 0, 0), Some(0.0));
    assert_eq!(pixel(&image, "col_id", 0, 0), Some(9.0));
}

#[test]
fn test_reduce_selection_end_to_end() {
    let a = l8_scene("a", date(2020, 7, 15), (1, 1), 1000.0, &[0.0]);
    let b = l8_scene("b", date(2020, 7, 25), (1, 1), 2000.0, &[0.0]);
    let backend = l8_backend(1, 1, vec![a, b]);
    let config = BapConfig {
        selection: Selection::Reduce {
            reducer: Reducer::Mean,
            top_k: 2,
        },
        ..l8_config(2020)
    };
    let bap = Bap::new(config).unwrap();
    let image = bap.composite_quiet(&backend, backend.grid().extent()).unwrap().image;
    assert!((pixel(&image, "blue", 0, 0).unwrap() - 1500.0).abs() < 1e-3);
    let d = pixel(&image, "date", 0, 0).unwrap();
    assert_eq!(date_from_band_value(d), Some(date(2020, 7, 15)));
}

#[test]
fn test_composite_reports_progress() {
    let backend = l8_backend(1, 1, vec![l8_scene("a", date(2020, 7, 15), (1, 1), 1.0, &[0.0])]);
    let bap = Bap::new(l8_config(2020)).unwrap();
    let reporter = Arc::new(RecordingReporter::default());
    bap.composite(&backend, backend.grid().extent(), reporter.clone())
        .unwrap();
    assert_eq!(
        *reporter.stages.lock().unwrap(),
        vec![
            CompositeStage::Planning,
            CompositeStage::Gathering,
            CompositeStage::Harmonizing,
            CompositeStage::Selecting,
        ]
    );
    assert_eq!(*reporter.advances.lock().unwrap(), vec![1]);
}

#[test]
fn test_no_sensor_for_year_is_empty_collection() {
    let config = BapConfig {
        sensors: Some(vec![SensorId::Landsat5Sr]),
        ..l8_config(2020)
    };
    let bap = Bap::new(config).unwrap();
    let backend = l8_backend(1, 1, Vec::new());
    assert!(matches!(
        bap.composite_quiet(&backend, backend.grid().extent()),
        Err(BapError::EmptyCollection)
    ));
}
