#[allow(dead_code)]
mod common;

use ndarray::Array2;

use bap_core::expression::{mean_std, sample_range, Expression, Formula};
use bap_core::image::Band;

// ---------------------------------------------------------------------------
// Range statistics
// ---------------------------------------------------------------------------

#[test]
fn test_sample_range_includes_both_ends() {
    assert_eq!(sample_range((0.0, 3.0)), vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(sample_range((5.0, 5.5)), vec![5.0]);
}

#[test]
fn test_mean_std_population() {
    let (mean, std) = mean_std(&[1.0, 2.0, 3.0]);
    assert!((mean - 2.0).abs() < 1e-12);
    assert!((std - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    assert_eq!(mean_std(&[]), (0.0, 0.0));
}

#[test]
fn test_expression_statistics() {
    let e = Expression::exponential((0.0, 100.0), -10.0).unwrap();
    assert!((e.mean() - 50.0).abs() < 1e-9);
    // Population std of 0..=100.
    let expected = ((101.0f64 * 101.0 - 1.0) / 12.0).sqrt();
    assert!((e.std() - expected).abs() < 1e-9);
    assert_eq!(e.range(), (0.0, 100.0));
    assert_eq!(e.name(), "Exponential");
}

#[test]
fn test_expression_rejects_empty_range() {
    assert!(Expression::exponential((10.0, 10.0), -10.0).is_err());
    assert!(Expression::gauss((10.0, 0.0), -0.5).is_err());
}

// ---------------------------------------------------------------------------
// Exponential
// ---------------------------------------------------------------------------

#[test]
fn test_exponential_decreases_over_range() {
    let e = Expression::exponential((0.0, 100.0), -10.0).unwrap();
    let low = e.eval(0.0);
    let mid = e.eval(50.0);
    let high = e.eval(100.0);
    assert!(low > mid && mid > high);
    assert!((mid - 0.5).abs() < 1e-9);
    assert!((low - (1.0 - 1.0 / (5.0f64.exp() + 1.0))).abs() < 1e-9);
}

#[test]
fn test_exponential_normalized_peak_is_one() {
    let e = Expression::exponential((0.0, 100.0), -10.0).unwrap();
    assert!((e.max_result() - e.eval(0.0)).abs() < 1e-12);
    assert!((e.eval_normalized(0.0) - 1.0).abs() < 1e-12);
    assert!(e.eval_normalized(100.0) < 0.01);
}

#[test]
fn test_exponential_clamps_above_max() {
    let e = Expression::exponential((0.0, 100.0), -10.0).unwrap();
    assert!((e.eval(100.0) - e.eval(250.0)).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Gauss
// ---------------------------------------------------------------------------

#[test]
fn test_gauss_peaks_at_mean() {
    let e = Expression::gauss((0.0, 100.0), -0.5).unwrap();
    assert!((e.eval_normalized(50.0) - 1.0).abs() < 1e-12);
    assert!((e.eval(40.0) - e.eval(60.0)).abs() < 1e-12);
    assert!(e.eval(0.0) < e.eval(25.0));
}

#[test]
fn test_gauss_positive_factor_is_flipped() {
    let a = Expression::gauss((0.0, 100.0), 0.5).unwrap();
    let b = Expression::gauss((0.0, 100.0), -0.5).unwrap();
    assert!((a.eval(30.0) - b.eval(30.0)).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Formula and rendering
// ---------------------------------------------------------------------------

#[test]
fn test_formula_default_is_exponential() {
    let e = Formula::default().build((0.0, 100.0)).unwrap();
    assert_eq!(e.name(), "Exponential");
}

#[test]
fn test_formula_json() {
    let f: Formula = serde_json::from_str(r#"{"type":"Gauss"}"#).unwrap();
    assert_eq!(f, Formula::Gauss { factor: -0.5 });
}

#[test]
fn test_render_local_keeps_var() {
    let e = Expression::exponential((0.0, 100.0), -10.0).unwrap();
    let text = e.render_local();
    assert!(text.contains("{var}"));
    assert!(!text.contains("{max}"));
    assert!(!text.contains("{mean}"));
}

#[test]
fn test_backend_expr_normalization() {
    let e = Expression::exponential((0.0, 100.0), -10.0).unwrap();
    let plain = e.backend_expr(false);
    let normalized = e.backend_expr(true);
    assert!(plain.contains("var"));
    assert!(normalized.starts_with('('));
    assert!(normalized.len() > plain.len());
}

#[test]
fn test_apply_band_keeps_mask() {
    let e = Expression::exponential((0.0, 100.0), -10.0).unwrap();
    let data = Array2::from_shape_vec((1, 2), vec![0.0, 100.0]).unwrap();
    let mask = Array2::from_shape_vec((1, 2), vec![true, false]).unwrap();
    let band = Band::with_mask(data, mask).unwrap();
    let out = e.apply_band(&band, true);
    assert!((out.get(0, 0).unwrap() - 1.0).abs() < 1e-6);
    assert_eq!(out.get(0, 1), None);
}
