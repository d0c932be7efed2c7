//! Collapsing the candidate pool into one image.

use ndarray::Array2;
use rayon::prelude::*;

use super::config::Reducer;
use crate::consts::{COL_ID_BAND, DATE_BAND, INTERVAL_MEAN_PERCENTILES, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{BapError, Result};
use crate::image::{Band, Image};
use crate::kernel::per_pixel;
use crate::stats::{interval_mean, median, mode};

impl Reducer {
    /// Reduce one pixel stack. Empty stacks give 0.
    pub fn reduce(&self, values: &mut [f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Reducer::Mean => values.iter().sum::<f32>() / values.len() as f32,
            Reducer::Median => median(values),
            Reducer::Mode => {
                values.sort_by(|a, b| a.total_cmp(b));
                mode(values)
            }
            Reducer::IntervalMean => {
                values.sort_by(|a, b| a.total_cmp(b));
                let (lo, hi) = INTERVAL_MEAN_PERCENTILES;
                interval_mean(values, lo, hi)
            }
        }
    }
}

/// Evaluate `f(row, col)` for every pixel, row-parallel on large grids.
fn per_pixel_generic<T, F>(shape: (usize, usize), f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, usize) -> T + Sync,
{
    let (h, w) = shape;
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<T>> = (0..h)
            .into_par_iter()
            .map(|row| (0..w).map(|col| f(row, col)).collect())
            .collect();
        rows.into_iter().flatten().collect()
    } else {
        (0..h)
            .flat_map(|row| (0..w).map(move |col| (row, col)))
            .map(|(row, col)| f(row, col))
            .collect()
    }
}

fn pool_shape(pool: &[Image]) -> Result<(usize, usize)> {
    pool.first()
        .and_then(Image::shape)
        .ok_or(BapError::EmptyCollection)
}

fn score_bands<'a>(pool: &'a [Image], score_band: &str) -> Result<Vec<&'a Band>> {
    pool.iter().map(|img| img.require_band(score_band)).collect()
}

fn output_image(pool: &[Image]) -> Image {
    let first = &pool[0];
    Image::new("composite", first.date, first.footprint)
}

/// Per pixel, copy every band from the candidate with the highest score.
///
/// Ties go to the earlier acquisition date, then to pool order. Pixels
/// without any valid score stay masked.
pub fn quality_mosaic(pool: &[Image], score_band: &str) -> Result<Image> {
    let shape = pool_shape(pool)?;
    let scores = score_bands(pool, score_band)?;

    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by_key(|&i| pool[i].date);

    let choice = per_pixel_generic(shape, |row, col| {
        let mut best: Option<(usize, f32)> = None;
        for &i in &order {
            if let Some(s) = scores[i].get(row, col) {
                if best.is_none_or(|(_, b)| s > b) {
                    best = Some((i, s));
                }
            }
        }
        best.map(|(i, _)| i)
    });

    let (_, w) = shape;
    let mut out = output_image(pool);
    for name in pool[0].band_names() {
        let mut data = Array2::<f32>::zeros(shape);
        let mut mask = Array2::from_elem(shape, false);
        for ((row, col), value) in data.indexed_iter_mut() {
            let Some(i) = choice[row * w + col] else {
                continue;
            };
            if let Some(v) = pool[i].band(name).and_then(|b| b.get(row, col)) {
                *value = v;
                mask[[row, col]] = true;
            }
        }
        out.add_band(name, Band { data, mask });
    }
    Ok(out)
}

/// Per pixel, reduce the `top_k` best-scored candidates band by band.
///
/// Masked values count as 0 and the stack is ordered by descending score,
/// ties going to the earlier acquisition date, then to pool order, as in
/// [`quality_mosaic`]. The collection-code and date bands are taken from the
/// best candidate instead of being reduced.
pub fn reduce_pool(pool: &[Image], score_band: &str, reducer: Reducer, top_k: usize) -> Result<Image> {
    let shape = pool_shape(pool)?;
    let scores = score_bands(pool, score_band)?;
    let k = top_k.clamp(1, pool.len());

    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by_key(|&i| pool[i].date);

    let selected: Vec<Vec<usize>> = per_pixel_generic(shape, |row, col| {
        let mut ranked: Vec<(usize, f32)> = order
            .iter()
            .map(|&i| (i, scores[i].get(row, col).unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked.into_iter().map(|(i, _)| i).collect()
    });

    let (_, w) = shape;
    let mut out = output_image(pool);
    for name in pool[0].band_names() {
        let bands: Vec<Option<&Band>> = pool.iter().map(|img| img.band(name)).collect();
        let value = |i: usize, row: usize, col: usize| -> f32 {
            bands[i].and_then(|b| b.get(row, col)).unwrap_or(0.0)
        };
        let data = if name == COL_ID_BAND || name == DATE_BAND {
            per_pixel(shape, |row, col| {
                let stack = &selected[row * w + col];
                stack.first().map_or(0.0, |&i| value(i, row, col))
            })
        } else {
            per_pixel(shape, |row, col| {
                let mut values: Vec<f32> = selected[row * w + col]
                    .iter()
                    .map(|&i| value(i, row, col))
                    .collect();
                reducer.reduce(&mut values)
            })
        };
        out.add_band(name, Band::new(data));
    }
    Ok(out)
}
