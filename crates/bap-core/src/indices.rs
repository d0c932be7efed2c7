//! Vegetation indices over canonical bands.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::catalog::{BLUE, NIR, RED, SWIR};
use crate::image::{Band, Image};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Ndvi,
    Evi,
    Nbr,
}

impl IndexKind {
    /// Band name the index is written to.
    pub fn band_name(&self) -> &'static str {
        match self {
            IndexKind::Ndvi => "ndvi",
            IndexKind::Evi => "evi",
            IndexKind::Nbr => "nbr",
        }
    }

    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            IndexKind::Ndvi => &[NIR, RED],
            IndexKind::Evi => &[NIR, RED, BLUE],
            IndexKind::Nbr => &[NIR, SWIR],
        }
    }

    /// Compute the index, or `None` when an input band is missing.
    ///
    /// Pixels where an input is masked or the denominator is zero are masked.
    pub fn compute(&self, image: &Image) -> Option<Band> {
        let inputs: Vec<&Band> = self
            .inputs()
            .iter()
            .map(|name| image.band(name))
            .collect::<Option<_>>()?;

        let shape = inputs[0].dim();
        let mut data = Array2::<f32>::zeros(shape);
        let mut mask = Array2::from_elem(shape, true);
        for band in &inputs {
            Zip::from(&mut mask).and(&band.mask).for_each(|m, &v| *m = *m && v);
        }

        for ((row, col), value) in data.indexed_iter_mut() {
            let v: Vec<f32> = inputs.iter().map(|b| b.data[[row, col]]).collect();
            let (num, den) = match self {
                IndexKind::Ndvi | IndexKind::Nbr => (v[0] - v[1], v[0] + v[1]),
                IndexKind::Evi => (
                    2.5 * (v[0] - v[1]),
                    v[0] + 6.0 * v[1] - 7.5 * v[2] + 1.0,
                ),
            };
            if den == 0.0 {
                mask[[row, col]] = false;
            } else {
                *value = num / den;
            }
        }
        Some(Band { data, mask })
    }

    /// Add the index band to `image`; no-op when inputs are missing.
    pub fn apply(&self, image: &mut Image) {
        if let Some(band) = self.compute(image) {
            image.add_band(self.band_name(), band);
        }
    }
}
