use chrono::NaiveDate;
use ndarray::Array2;

use bap_core::backend::InMemoryBackend;
use bap_core::catalog::{descriptor_for, SensorId};
use bap_core::image::{Band, Grid, Image, Rect};
use bap_core::scores::ScoreContext;
use bap_core::season::Season;

pub const PIXEL_SIZE: f64 = 30.0;

/// `pixel_qa` value with the cloud bit set.
pub const QA_CLOUD: f32 = 32.0;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn grid(rows: usize, cols: usize) -> Grid {
    Grid::new(rows, cols, PIXEL_SIZE)
}

/// Band from row-major values.
pub fn band(shape: (usize, usize), values: &[f32]) -> Band {
    Band::new(Array2::from_shape_vec(shape, values.to_vec()).unwrap())
}

/// Image whose bands are each filled with one value.
pub fn constant_image(id: &str, on: NaiveDate, shape: (usize, usize), bands: &[(&str, f32)]) -> Image {
    let mut image = Image::new(id, on, Rect::new(0, 0, shape.0, shape.1));
    for (name, value) in bands {
        image.add_band(*name, Band::constant(shape, *value));
    }
    image
}

/// Score context for `sensor` over the whole grid.
pub fn context(sensor: SensorId, year: i32, grid: Grid) -> ScoreContext {
    ScoreContext {
        sensor: descriptor_for(sensor),
        target: descriptor_for(SensorId::Landsat8Sr),
        year,
        main_year: year,
        region: grid.extent(),
        grid,
        season: Season::growing_north(),
        slc_off: false,
    }
}

/// Landsat 8 SR scene with every reflectance band set to `value` and the
/// given per-pixel `pixel_qa` values.
pub fn l8_scene(id: &str, on: NaiveDate, shape: (usize, usize), value: f32, qa: &[f32]) -> Image {
    let mut image = constant_image(
        id,
        on,
        shape,
        &[
            ("B2", value),
            ("B3", value),
            ("B4", value),
            ("B5", value),
            ("B6", value),
            ("B7", value),
        ],
    );
    image.add_band("pixel_qa", band(shape, qa));
    image.set_property("CLOUD_COVER", 10.0);
    image
}

/// Backend with the given Landsat 8 SR scenes on a `rows x cols` grid.
pub fn l8_backend(rows: usize, cols: usize, scenes: Vec<Image>) -> InMemoryBackend {
    let mut backend = InMemoryBackend::new(grid(rows, cols));
    for scene in scenes {
        backend.add_image(SensorId::Landsat8Sr, scene).unwrap();
    }
    backend
}
