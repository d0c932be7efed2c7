use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::catalog::SensorId;
use crate::error::{BapError, Result};

/// Pixel grid shared by every image of a composite request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    /// Ground size of one pixel in metres.
    pub pixel_size: f64,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, pixel_size: f64) -> Self {
        Self {
            rows,
            cols,
            pixel_size,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// The rectangle covering the whole grid.
    pub fn extent(&self) -> Rect {
        Rect::new(0, 0, self.rows, self.cols)
    }
}

/// Pixel-space rectangle, used both for image footprints and sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Rect {
    pub fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self {
            row,
            col,
            rows,
            cols,
        }
    }

    pub fn area(&self) -> usize {
        self.rows * self.cols
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row && row < self.row + self.rows && col >= self.col && col < self.col + self.cols
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r0 = self.row.max(other.row);
        let c0 = self.col.max(other.col);
        let r1 = (self.row + self.rows).min(other.row + other.rows);
        let c1 = (self.col + self.cols).min(other.col + other.cols);
        if r1 > r0 && c1 > c0 {
            Some(Rect::new(r0, c0, r1 - r0, c1 - c0))
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.row, self.col, self.rows, self.cols)
    }
}

impl std::str::FromStr for Rect {
    type Err = BapError;

    /// Parse `row,col,rows,cols`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<usize> = s
            .split(',')
            .map(|p| p.trim().parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| BapError::InvalidConfig(format!("invalid region '{s}': {e}")))?;
        match parts.as_slice() {
            [row, col, rows, cols] => Ok(Rect::new(*row, *col, *rows, *cols)),
            _ => Err(BapError::InvalidConfig(format!(
                "region '{s}' must have the form row,col,rows,cols"
            ))),
        }
    }
}

/// One raster band: values plus a validity mask (`true` = valid pixel).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub data: Array2<f32>,
    pub mask: Array2<bool>,
}

impl Band {
    /// A fully valid band.
    pub fn new(data: Array2<f32>) -> Self {
        let mask = Array2::from_elem(data.dim(), true);
        Self { data, mask }
    }

    pub fn with_mask(data: Array2<f32>, mask: Array2<bool>) -> Result<Self> {
        if data.dim() != mask.dim() {
            return Err(BapError::ShapeMismatch {
                expected: data.dim(),
                found: mask.dim(),
            });
        }
        Ok(Self { data, mask })
    }

    pub fn constant(shape: (usize, usize), value: f32) -> Self {
        Self::new(Array2::from_elem(shape, value))
    }

    /// A band whose pixels are all masked.
    pub fn masked(shape: (usize, usize)) -> Self {
        Self {
            data: Array2::zeros(shape),
            mask: Array2::from_elem(shape, false),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Value at a pixel, `None` when masked.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if self.mask[[row, col]] {
            Some(self.data[[row, col]])
        } else {
            None
        }
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Combine the band mask with `mask` (logical AND).
    pub fn update_mask(&mut self, mask: &Array2<bool>) {
        Zip::from(&mut self.mask).and(mask).for_each(|m, &other| {
            *m = *m && other;
        });
    }

    /// Masked pixels become zero-valued valid pixels.
    pub fn unmask(&self) -> Band {
        let mut data = self.data.clone();
        Zip::from(&mut data).and(&self.mask).for_each(|v, &valid| {
            if !valid {
                *v = 0.0;
            }
        });
        Band::new(data)
    }

    /// Apply `f` to every pixel value, keeping the mask.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Band {
        Band {
            data: self.data.mapv(f),
            mask: self.mask.clone(),
        }
    }
}

/// A single observation: a dated, multi-band raster with metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub date: NaiveDate,
    pub footprint: Rect,
    pub bands: Vec<(String, Band)>,
    #[serde(default)]
    pub properties: BTreeMap<String, f64>,
    #[serde(default)]
    pub sensor: Option<SensorId>,
    #[serde(default)]
    pub year_bucket: Option<i32>,
    /// Zero-valued placeholder standing in for an empty collection.
    #[serde(default)]
    pub proxy: bool,
}

impl Image {
    pub fn new(id: impl Into<String>, date: NaiveDate, footprint: Rect) -> Self {
        Self {
            id: id.into(),
            date,
            footprint,
            bands: Vec::new(),
            properties: BTreeMap::new(),
            sensor: None,
            year_bucket: None,
            proxy: false,
        }
    }

    pub fn with_band(mut self, name: impl Into<String>, band: Band) -> Self {
        self.add_band(name, band);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn shape(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|(_, b)| b.dim())
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|(n, _)| n == name)
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub fn band_mut(&mut self, name: &str) -> Option<&mut Band> {
        self.bands.iter_mut().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    pub fn require_band(&self, name: &str) -> Result<&Band> {
        self.band(name).ok_or_else(|| BapError::MissingBand {
            band: name.to_string(),
            image: self.id.clone(),
        })
    }

    /// Add a band, replacing any existing band with the same name in place.
    pub fn add_band(&mut self, name: impl Into<String>, band: Band) {
        let name = name.into();
        match self.bands.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = band,
            None => self.bands.push((name, band)),
        }
    }

    pub fn remove_band(&mut self, name: &str) -> Option<Band> {
        let idx = self.bands.iter().position(|(n, _)| n == name)?;
        Some(self.bands.remove(idx).1)
    }

    pub fn rename_band(&mut self, from: &str, to: &str) {
        if let Some((n, _)) = self.bands.iter_mut().find(|(n, _)| n == from) {
            *n = to.to_string();
        }
    }

    /// Keep only `names`, in that order. Names not present are skipped.
    pub fn retain_bands<S: AsRef<str>>(&mut self, names: &[S]) {
        let mut kept = Vec::with_capacity(names.len());
        for name in names {
            if let Some(idx) = self.bands.iter().position(|(n, _)| n == name.as_ref()) {
                kept.push(self.bands.swap_remove(idx));
            }
        }
        self.bands = kept;
    }

    /// Mask of the first band, the image's reference mask.
    pub fn mask(&self) -> Option<&Array2<bool>> {
        self.bands.first().map(|(_, b)| &b.mask)
    }

    /// Combine every band's mask with `mask`.
    pub fn update_mask(&mut self, mask: &Array2<bool>) {
        for (_, band) in &mut self.bands {
            band.update_mask(mask);
        }
    }

    pub fn unmask(&self) -> Image {
        let mut out = self.clone();
        for (_, band) in &mut out.bands {
            *band = band.unmask();
        }
        out
    }

    /// Mask every pixel outside `region`.
    pub fn clip(&self, region: &Rect) -> Image {
        let mut out = self.clone();
        if let Some((h, w)) = self.shape() {
            let inside = Array2::from_shape_fn((h, w), |(r, c)| region.contains(r, c));
            out.update_mask(&inside);
        }
        if let Some(footprint) = self.footprint.intersection(region) {
            out.footprint = footprint;
        }
        out
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: f64) {
        self.properties.insert(name.into(), value);
    }
}
