//! Per-pixel neighbourhood operations: distance to the nearest masked
//! pixel and valid-pixel counts inside a kernel footprint.

use ndarray::{Array2, ArrayViewMut1, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
    Chebyshev,
}

impl DistanceMetric {
    pub fn distance(&self, dr: isize, dc: isize) -> f32 {
        let (r, c) = (dr.unsigned_abs() as f32, dc.unsigned_abs() as f32);
        match self {
            DistanceMetric::Euclidean => (r * r + c * c).sqrt(),
            DistanceMetric::Manhattan => r + c,
            DistanceMetric::Chebyshev => r.max(c),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelShape {
    #[default]
    Square,
    Circle,
    Diamond,
    Plus,
}

impl KernelShape {
    /// Whether offset `(dr, dc)` lies inside the kernel of `radius`.
    pub fn contains(&self, dr: isize, dc: isize, radius: usize) -> bool {
        let r = radius as isize;
        if dr.abs() > r || dc.abs() > r {
            return false;
        }
        match self {
            KernelShape::Square => true,
            KernelShape::Circle => dr * dr + dc * dc <= r * r,
            KernelShape::Diamond => dr.abs() + dc.abs() <= r,
            KernelShape::Plus => dr == 0 || dc == 0,
        }
    }

    /// Number of cells in the full kernel footprint.
    pub fn cell_count(&self, radius: usize) -> usize {
        let r = radius as isize;
        let mut count = 0;
        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc, radius) {
                    count += 1;
                }
            }
        }
        count
    }
}

/// Evaluate `f(row, col)` for every pixel, row-parallel on large grids.
pub fn per_pixel<F>(shape: (usize, usize), f: F) -> Array2<f32>
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    let (h, w) = shape;
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| (0..w).map(|col| f(row, col)).collect())
            .collect();

        let mut result = Array2::<f32>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        Array2::from_shape_fn((h, w), |(row, col)| f(row, col))
    }
}

/// Distance in pixels from each valid pixel to the nearest invalid pixel.
///
/// Pixels with no invalid pixel within `radius` get `f32::INFINITY`;
/// invalid pixels get 0. Out-of-grid cells are not treated as invalid.
/// Runs in time linear in the pixel count for every metric.
pub fn distance_to_masked(mask: &Array2<bool>, metric: DistanceMetric, radius: usize) -> Array2<f32> {
    if mask.iter().all(|&valid| valid) {
        return Array2::from_elem(mask.dim(), f32::INFINITY);
    }

    let distances = match metric {
        DistanceMetric::Euclidean => euclidean_transform(mask),
        DistanceMetric::Manhattan => chamfer_transform(mask, false),
        DistanceMetric::Chebyshev => chamfer_transform(mask, true),
    };
    let limit = radius as f32;
    distances.mapv(|d| if d <= limit { d } else { f32::INFINITY })
}

/// Apply `f` to every lane, in parallel on large grids.
fn for_each_lane<F>(lanes: ndarray::iter::LanesMut<'_, f64, ndarray::Ix1>, pixels: usize, f: F)
where
    F: Fn(ArrayViewMut1<'_, f64>) + Sync + Send,
{
    if pixels >= PARALLEL_PIXEL_THRESHOLD {
        Zip::from(lanes).par_for_each(f);
    } else {
        Zip::from(lanes).for_each(f);
    }
}

/// Exact euclidean distance transform (Felzenszwalb and Huttenlocher):
/// a 1-D squared-distance pass down every column, then along every row.
fn euclidean_transform(mask: &Array2<bool>) -> Array2<f32> {
    let (h, w) = mask.dim();
    let mut squared = mask.mapv(|valid| if valid { f64::INFINITY } else { 0.0 });

    for_each_lane(squared.columns_mut(), h * w, |mut column| squared_distance_1d(&mut column));
    for_each_lane(squared.rows_mut(), h * w, |mut row| squared_distance_1d(&mut row));

    squared.mapv(|d| d.sqrt() as f32)
}

/// Lower envelope of parabolas rooted at the finite samples of `f`,
/// written back in place. A line without finite samples stays infinite.
fn squared_distance_1d(f: &mut ArrayViewMut1<'_, f64>) {
    let n = f.len();
    let input = f.to_vec();
    let mut roots = vec![0usize; n];
    let mut bounds = vec![0.0f64; n + 1];
    let mut k: Option<usize> = None;

    let intersect = |q: usize, p: usize| {
        let (qf, pf) = (q as f64, p as f64);
        ((input[q] + qf * qf) - (input[p] + pf * pf)) / (2.0 * qf - 2.0 * pf)
    };

    for q in 0..n {
        if !input[q].is_finite() {
            continue;
        }
        let Some(mut top) = k else {
            roots[0] = q;
            bounds[0] = f64::NEG_INFINITY;
            bounds[1] = f64::INFINITY;
            k = Some(0);
            continue;
        };
        let mut s = intersect(q, roots[top]);
        while s <= bounds[top] {
            top -= 1;
            s = intersect(q, roots[top]);
        }
        top += 1;
        roots[top] = q;
        bounds[top] = s;
        bounds[top + 1] = f64::INFINITY;
        k = Some(top);
    }

    if k.is_none() {
        return;
    }
    let mut j = 0;
    for q in 0..n {
        while bounds[j + 1] < q as f64 {
            j += 1;
        }
        let offset = q as f64 - roots[j] as f64;
        f[q] = offset * offset + input[roots[j]];
    }
}

/// Two-pass chamfer transform with unit steps: 4-connected for manhattan,
/// 8-connected (diagonals included) for chebyshev. Both are exact.
fn chamfer_transform(mask: &Array2<bool>, diagonal: bool) -> Array2<f32> {
    let (h, w) = mask.dim();
    let mut d = mask.mapv(|valid| if valid { f32::INFINITY } else { 0.0 });

    for row in 0..h {
        for col in 0..w {
            let mut best = d[[row, col]];
            if row > 0 {
                best = best.min(d[[row - 1, col]] + 1.0);
                if diagonal && col > 0 {
                    best = best.min(d[[row - 1, col - 1]] + 1.0);
                }
                if diagonal && col + 1 < w {
                    best = best.min(d[[row - 1, col + 1]] + 1.0);
                }
            }
            if col > 0 {
                best = best.min(d[[row, col - 1]] + 1.0);
            }
            d[[row, col]] = best;
        }
    }

    for row in (0..h).rev() {
        for col in (0..w).rev() {
            let mut best = d[[row, col]];
            if row + 1 < h {
                best = best.min(d[[row + 1, col]] + 1.0);
                if diagonal && col + 1 < w {
                    best = best.min(d[[row + 1, col + 1]] + 1.0);
                }
                if diagonal && col > 0 {
                    best = best.min(d[[row + 1, col - 1]] + 1.0);
                }
            }
            if col + 1 < w {
                best = best.min(d[[row, col + 1]] + 1.0);
            }
            d[[row, col]] = best;
        }
    }
    d
}

/// Count of valid pixels inside the kernel centred on each pixel.
pub fn neighbourhood_count(mask: &Array2<bool>, shape: KernelShape, radius: usize) -> Array2<f32> {
    let (h, w) = mask.dim();
    let r = radius as isize;
    let offsets: Vec<(isize, isize)> = (-r..=r)
        .flat_map(|dr| (-r..=r).map(move |dc| (dr, dc)))
        .filter(|&(dr, dc)| dr.unsigned_abs() < h && dc.unsigned_abs() < w)
        .filter(|&(dr, dc)| shape.contains(dr, dc, radius))
        .collect();

    per_pixel((h, w), |row, col| {
        offsets
            .iter()
            .filter(|&&(dr, dc)| {
                let nr = row as isize + dr;
                let nc = col as isize + dc;
                nr >= 0
                    && nr < h as isize
                    && nc >= 0
                    && nc < w as isize
                    && mask[[nr as usize, nc as usize]]
            })
            .count() as f32
    })
}
