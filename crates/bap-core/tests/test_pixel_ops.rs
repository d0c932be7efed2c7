#[allow(dead_code)]
mod common;

use bap_core::image::Image;
use bap_core::indices::IndexKind;
use bap_core::kernel::{distance_to_masked, neighbourhood_count, DistanceMetric, KernelShape};
use ndarray::{array, Array2};

use common::{constant_image, date};

fn surface(nir: f32, red: f32, blue: f32, swir: f32) -> Image {
    constant_image(
        "s",
        date(2020, 1, 15),
        (2, 2),
        &[("blue", blue), ("red", red), ("nir", nir), ("swir", swir)],
    )
}

// ---------------------------------------------------------------------------
// Indices
// ---------------------------------------------------------------------------

#[test]
fn test_ndvi_value() {
    let image = surface(0.5, 0.1, 0.05, 0.2);
    let ndvi = IndexKind::Ndvi.compute(&image).unwrap();
    assert!((ndvi.data[[0, 0]] - 0.4 / 0.6).abs() < 1e-6);
    assert_eq!(ndvi.valid_count(), 4);
}

#[test]
fn test_evi_and_nbr_values() {
    let image = surface(0.5, 0.1, 0.05, 0.2);
    let evi = IndexKind::Evi.compute(&image).unwrap();
    let expected = 2.5 * 0.4 / (0.5 + 0.6 - 0.375 + 1.0);
    assert!((evi.data[[1, 1]] - expected).abs() < 1e-6);

    let nbr = IndexKind::Nbr.compute(&image).unwrap();
    assert!((nbr.data[[0, 1]] - 0.3 / 0.7).abs() < 1e-6);
}

#[test]
fn test_index_zero_denominator_is_masked() {
    let image = surface(0.0, 0.0, 0.0, 0.0);
    let ndvi = IndexKind::Ndvi.compute(&image).unwrap();
    assert_eq!(ndvi.valid_count(), 0);
}

#[test]
fn test_index_inherits_input_masks() {
    let mut image = surface(0.5, 0.1, 0.05, 0.2);
    image.band_mut("red").unwrap().mask[[0, 0]] = false;
    let ndvi = IndexKind::Ndvi.compute(&image).unwrap();
    assert!(!ndvi.mask[[0, 0]]);
    assert_eq!(ndvi.valid_count(), 3);
}

#[test]
fn test_index_skipped_without_inputs() {
    let mut image = constant_image("s", date(2020, 1, 15), (2, 2), &[("red", 0.1)]);
    assert!(IndexKind::Nbr.compute(&image).is_none());
    IndexKind::Nbr.apply(&mut image);
    assert!(!image.has_band("nbr"));
}

#[test]
fn test_index_apply_adds_band() {
    let mut image = surface(0.5, 0.1, 0.05, 0.2);
    IndexKind::Ndvi.apply(&mut image);
    assert!(image.has_band("ndvi"));
    assert_eq!(IndexKind::Ndvi.inputs(), &["nir", "red"]);
}

// ---------------------------------------------------------------------------
// Kernel shapes
// ---------------------------------------------------------------------------

#[test]
fn test_kernel_cell_counts() {
    assert_eq!(KernelShape::Square.cell_count(1), 9);
    assert_eq!(KernelShape::Plus.cell_count(1), 5);
    assert_eq!(KernelShape::Diamond.cell_count(2), 13);
    assert_eq!(KernelShape::Circle.cell_count(2), 13);
    assert_eq!(KernelShape::Square.cell_count(0), 1);
}

#[test]
fn test_distance_metrics() {
    assert!((DistanceMetric::Euclidean.distance(3, 4) - 5.0).abs() < 1e-6);
    assert_eq!(DistanceMetric::Manhattan.distance(-3, 4), 7.0);
    assert_eq!(DistanceMetric::Chebyshev.distance(3, -4), 4.0);
}

// ---------------------------------------------------------------------------
// Neighbourhood operations
// ---------------------------------------------------------------------------

#[test]
fn test_distance_to_single_masked_pixel() {
    let mut mask = Array2::from_elem((5, 5), true);
    mask[[2, 2]] = false;

    let d = distance_to_masked(&mask, DistanceMetric::Euclidean, 10);
    assert_eq!(d[[2, 2]], 0.0);
    assert_eq!(d[[2, 3]], 1.0);
    assert!((d[[0, 0]] - 8f32.sqrt()).abs() < 1e-6);

    let d = distance_to_masked(&mask, DistanceMetric::Manhattan, 10);
    assert_eq!(d[[0, 0]], 4.0);
}

#[test]
fn test_distance_beyond_radius_is_infinite() {
    let mut mask = Array2::from_elem((1, 6), true);
    mask[[0, 0]] = false;
    let d = distance_to_masked(&mask, DistanceMetric::Euclidean, 2);
    assert_eq!(d[[0, 2]], 2.0);
    assert!(d[[0, 3]].is_infinite());
}

#[test]
fn test_distance_without_masked_pixels() {
    let mask = Array2::from_elem((3, 3), true);
    let d = distance_to_masked(&mask, DistanceMetric::Chebyshev, 5);
    assert!(d.iter().all(|v| v.is_infinite()));
}

#[test]
fn test_neighbourhood_count_at_edges() {
    let mask = array![[true, true, true], [true, false, true], [true, true, true]];
    let counts = neighbourhood_count(&mask, KernelShape::Square, 1);
    assert_eq!(counts[[1, 1]], 8.0);
    assert_eq!(counts[[0, 0]], 3.0);

    let plus = neighbourhood_count(&mask, KernelShape::Plus, 1);
    assert_eq!(plus[[0, 1]], 3.0);
}

fn brute_force_distance(mask: &Array2<bool>, metric: DistanceMetric, radius: usize) -> Array2<f32> {
    let (h, w) = mask.dim();
    Array2::from_shape_fn((h, w), |(row, col)| {
        if !mask[[row, col]] {
            return 0.0;
        }
        let mut best = f32::INFINITY;
        for ((r, c), &valid) in mask.indexed_iter() {
            if !valid {
                let d = metric.distance(r as isize - row as isize, c as isize - col as isize);
                best = best.min(d);
            }
        }
        if best <= radius as f32 {
            best
        } else {
            f32::INFINITY
        }
    })
}

#[test]
fn test_distance_transform_matches_exhaustive_search() {
    let mut mask = Array2::from_elem((9, 13), true);
    for &(r, c) in &[(0, 0), (4, 6), (8, 12), (2, 11), (7, 1), (7, 2)] {
        mask[[r, c]] = false;
    }
    for metric in [DistanceMetric::Euclidean, DistanceMetric::Manhattan, DistanceMetric::Chebyshev] {
        for radius in [1, 3, 20] {
            let fast = distance_to_masked(&mask, metric, radius);
            let slow = brute_force_distance(&mask, metric, radius);
            for ((pos, a), b) in fast.indexed_iter().zip(slow.iter()) {
                assert!(
                    (a.is_infinite() && b.is_infinite()) || (a - b).abs() < 1e-4,
                    "{metric:?} radius {radius} at {pos:?}: {a} vs {b}"
                );
            }
        }
    }
}

#[test]
fn test_distance_transform_on_large_grid() {
    let mut mask = Array2::from_elem((400, 400), true);
    mask[[0, 0]] = false;
    let d = distance_to_masked(&mask, DistanceMetric::Euclidean, 255);
    assert!((d[[100, 100]] - 20_000f32.sqrt()).abs() < 1e-3);
    assert_eq!(d[[0, 255]], 255.0);
    assert!(d[[0, 256]].is_infinite());
    assert!(d[[399, 399]].is_infinite());
}
