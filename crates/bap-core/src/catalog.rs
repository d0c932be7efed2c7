use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{BapError, Result};

pub const BLUE: &str = "blue";
pub const GREEN: &str = "green";
pub const RED: &str = "red";
pub const NIR: &str = "nir";
pub const SWIR: &str = "swir";
pub const SWIR2: &str = "swir2";
pub const ATMOS_OPACITY: &str = "atmos_opacity";

/// Canonical band names, in schema order.
pub const CANONICAL_BANDS: [&str; 7] = [BLUE, GREEN, RED, NIR, SWIR, SWIR2, ATMOS_OPACITY];

/// Satellite image collections known to the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorId {
    #[serde(rename = "LANDSAT/LM01/C01/T1")]
    Landsat1,
    #[serde(rename = "LANDSAT/LM02/C01/T1")]
    Landsat2,
    #[serde(rename = "LANDSAT/LM03/C01/T1")]
    Landsat3,
    #[serde(rename = "LANDSAT/LT04/C01/T1_TOA")]
    Landsat4Toa,
    #[serde(rename = "LANDSAT/LT04/C01/T1_SR")]
    Landsat4Sr,
    #[serde(rename = "LANDSAT/LT05/C01/T1_TOA")]
    Landsat5Toa,
    #[serde(rename = "LANDSAT/LT05/C01/T1_SR")]
    Landsat5Sr,
    #[serde(rename = "LANDSAT/LE07/C01/T1_TOA")]
    Landsat7Toa,
    #[serde(rename = "LANDSAT/LE07/C01/T1_SR")]
    Landsat7Sr,
    #[serde(rename = "LANDSAT/LC08/C01/T1_TOA")]
    Landsat8Toa,
    #[serde(rename = "LANDSAT/LC08/C01/T1_SR")]
    Landsat8Sr,
    #[serde(rename = "COPERNICUS/S2")]
    Sentinel2Toa,
    #[serde(rename = "COPERNICUS/S2_SR")]
    Sentinel2Sr,
    #[serde(rename = "MODIS/MOD09GA")]
    ModisTerra,
    #[serde(rename = "MODIS/MYD09GA")]
    ModisAqua,
}

impl SensorId {
    pub const ALL: [SensorId; 15] = [
        SensorId::Landsat1,
        SensorId::Landsat2,
        SensorId::Landsat3,
        SensorId::Landsat4Toa,
        SensorId::Landsat4Sr,
        SensorId::Landsat5Toa,
        SensorId::Landsat5Sr,
        SensorId::Landsat7Toa,
        SensorId::Landsat7Sr,
        SensorId::Landsat8Toa,
        SensorId::Landsat8Sr,
        SensorId::Sentinel2Toa,
        SensorId::Sentinel2Sr,
        SensorId::ModisTerra,
        SensorId::ModisAqua,
    ];

    /// Collection id as used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorId::Landsat1 => "LANDSAT/LM01/C01/T1",
            SensorId::Landsat2 => "LANDSAT/LM02/C01/T1",
            SensorId::Landsat3 => "LANDSAT/LM03/C01/T1",
            SensorId::Landsat4Toa => "LANDSAT/LT04/C01/T1_TOA",
            SensorId::Landsat4Sr => "LANDSAT/LT04/C01/T1_SR",
            SensorId::Landsat5Toa => "LANDSAT/LT05/C01/T1_TOA",
            SensorId::Landsat5Sr => "LANDSAT/LT05/C01/T1_SR",
            SensorId::Landsat7Toa => "LANDSAT/LE07/C01/T1_TOA",
            SensorId::Landsat7Sr => "LANDSAT/LE07/C01/T1_SR",
            SensorId::Landsat8Toa => "LANDSAT/LC08/C01/T1_TOA",
            SensorId::Landsat8Sr => "LANDSAT/LC08/C01/T1_SR",
            SensorId::Sentinel2Toa => "COPERNICUS/S2",
            SensorId::Sentinel2Sr => "COPERNICUS/S2_SR",
            SensorId::ModisTerra => "MODIS/MOD09GA",
            SensorId::ModisAqua => "MODIS/MYD09GA",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    pub fn descriptor(&self) -> &'static SensorDescriptor {
        descriptor_for(*self)
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorId {
    type Err = BapError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        SensorId::ALL
            .into_iter()
            .find(|id| id.as_str() == s || id.descriptor().short_name.eq_ignore_ascii_case(s))
            .ok_or_else(|| BapError::UnknownSensor(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    Landsat,
    Sentinel,
    Modis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessLevel {
    Raw,
    Toa,
    Sr,
}

/// How a sensor's quality band flags cloud, shadow and snow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QaEncoding {
    /// Categorical band: each condition is a set of class values.
    Classes {
        band: &'static str,
        fill: &'static [u16],
        cloud: &'static [u16],
        shadow: &'static [u16],
        snow: &'static [u16],
    },
    /// Bit-packed band: a condition holds when any of its bits is set.
    Bits {
        band: &'static str,
        fill: &'static [u32],
        cloud: &'static [u32],
        shadow: &'static [u32],
        snow: &'static [u32],
    },
}

impl QaEncoding {
    /// Fmask classification of the TOA collections.
    pub const FMASK: QaEncoding = QaEncoding::Classes {
        band: "fmask",
        fill: &[255],
        cloud: &[5],
        shadow: &[3],
        snow: &[4],
    };

    /// LEDAPS `QA` band of the Landsat 4/5/7 surface reflectance products.
    pub const LEDAPS: QaEncoding = QaEncoding::Bits {
        band: "QA",
        fill: &[1],
        cloud: &[2],
        shadow: &[],
        snow: &[4],
    };

    /// Landsat 8 surface reflectance `pixel_qa`.
    pub const PIXEL_QA: QaEncoding = QaEncoding::Bits {
        band: "pixel_qa",
        fill: &[0],
        cloud: &[5],
        shadow: &[3],
        snow: &[4],
    };

    /// Sentinel-2 `QA60`: opaque clouds (bit 10) and cirrus (bit 11).
    pub const QA60: QaEncoding = QaEncoding::Bits {
        band: "QA60",
        fill: &[],
        cloud: &[10, 11],
        shadow: &[],
        snow: &[],
    };

    /// MODIS `state_1km`.
    pub const MODIS_STATE: QaEncoding = QaEncoding::Bits {
        band: "state_1km",
        fill: &[],
        cloud: &[0, 1, 10],
        shadow: &[2],
        snow: &[11],
    };

    pub fn band(&self) -> &'static str {
        match self {
            QaEncoding::Classes { band, .. } | QaEncoding::Bits { band, .. } => band,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BandSpec {
    pub canonical: &'static str,
    pub native: &'static str,
    /// Ground sampling distance in metres.
    pub scale: f64,
    pub range: (f64, f64),
    /// Whether the band follows the reflectance range and gets rescaled.
    pub rescale: bool,
}

const fn reflectance(canonical: &'static str, native: &'static str, scale: f64, max: f64) -> BandSpec {
    BandSpec {
        canonical,
        native,
        scale,
        range: (0.0, max),
        rescale: true,
    }
}

/// Immutable description of one satellite collection.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorDescriptor {
    pub id: SensorId,
    pub family: Family,
    pub process: ProcessLevel,
    pub short_name: &'static str,
    /// Numeric code written into the collection-id band.
    pub code: u8,
    pub bands: Vec<BandSpec>,
    /// Nominal resolution in metres.
    pub scale: f64,
    /// Scene-level cloud percentage property.
    pub cloud_cover: Option<&'static str>,
    pub qa: Option<QaEncoding>,
    pub first_year: i32,
    /// `None` while the mission is still acquiring.
    pub last_year: Option<i32>,
}

impl SensorDescriptor {
    pub fn band(&self, canonical: &str) -> Option<&BandSpec> {
        self.bands.iter().find(|b| b.canonical == canonical)
    }

    pub fn canonical_bands(&self) -> Vec<&'static str> {
        self.bands.iter().map(|b| b.canonical).collect()
    }

    /// Upper bound of the valid range of a canonical band.
    pub fn max_of(&self, canonical: &str) -> Option<f64> {
        self.band(canonical).map(|b| b.range.1)
    }

    pub fn valid_in(&self, year: i32) -> bool {
        year >= self.first_year && self.last_year.is_none_or(|last| year <= last)
    }
}

fn landsat1() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat1,
        family: Family::Landsat,
        process: ProcessLevel::Raw,
        short_name: "L1",
        code: 1,
        bands: vec![
            reflectance(GREEN, "B4", 60.0, 255.0),
            reflectance(RED, "B5", 60.0, 255.0),
            reflectance(NIR, "B6", 60.0, 255.0),
            reflectance(SWIR, "B7", 60.0, 255.0),
        ],
        scale: 60.0,
        cloud_cover: Some("CLOUD_COVER"),
        qa: None,
        first_year: 1972,
        last_year: Some(1978),
    }
}

fn landsat2() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat2,
        short_name: "L2",
        code: 2,
        first_year: 1975,
        last_year: Some(1983),
        ..landsat1()
    }
}

fn landsat3() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat3,
        short_name: "L3",
        code: 3,
        first_year: 1978,
        last_year: Some(1983),
        ..landsat1()
    }
}

fn tm_bands(max: f64) -> Vec<BandSpec> {
    vec![
        reflectance(BLUE, "B1", 30.0, max),
        reflectance(GREEN, "B2", 30.0, max),
        reflectance(RED, "B3", 30.0, max),
        reflectance(NIR, "B4", 30.0, max),
        reflectance(SWIR, "B5", 30.0, max),
        reflectance(SWIR2, "B7", 30.0, max),
    ]
}

fn landsat4_toa() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat4Toa,
        family: Family::Landsat,
        process: ProcessLevel::Toa,
        short_name: "L4TOA",
        code: 4,
        bands: tm_bands(1.0),
        scale: 30.0,
        cloud_cover: Some("CLOUD_COVER"),
        qa: Some(QaEncoding::FMASK),
        first_year: 1982,
        last_year: Some(1993),
    }
}

fn with_atmos_opacity(mut bands: Vec<BandSpec>) -> Vec<BandSpec> {
    bands.push(BandSpec {
        canonical: ATMOS_OPACITY,
        native: "sr_atmos_opacity",
        scale: 30.0,
        range: (0.0, 1000.0),
        rescale: false,
    });
    bands
}

fn landsat4_sr() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat4Sr,
        process: ProcessLevel::Sr,
        short_name: "L4SR",
        code: 5,
        bands: with_atmos_opacity(tm_bands(10_000.0)),
        qa: Some(QaEncoding::LEDAPS),
        ..landsat4_toa()
    }
}

fn landsat5_toa() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat5Toa,
        short_name: "L5TOA",
        code: 6,
        first_year: 1984,
        last_year: Some(2013),
        ..landsat4_toa()
    }
}

fn landsat5_sr() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat5Sr,
        short_name: "L5SR",
        code: 7,
        first_year: 1984,
        last_year: Some(2013),
        ..landsat4_sr()
    }
}

fn landsat7_toa() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat7Toa,
        short_name: "L7TOA",
        code: 8,
        first_year: 1999,
        last_year: None,
        ..landsat5_toa()
    }
}

fn landsat7_sr() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat7Sr,
        short_name: "L7SR",
        code: 9,
        first_year: 1999,
        last_year: None,
        ..landsat5_sr()
    }
}

fn oli_bands(max: f64) -> Vec<BandSpec> {
    vec![
        reflectance(BLUE, "B2", 30.0, max),
        reflectance(GREEN, "B3", 30.0, max),
        reflectance(RED, "B4", 30.0, max),
        reflectance(NIR, "B5", 30.0, max),
        reflectance(SWIR, "B6", 30.0, max),
        reflectance(SWIR2, "B7", 30.0, max),
    ]
}

fn landsat8_toa() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat8Toa,
        short_name: "L8TOA",
        code: 10,
        bands: oli_bands(1.0),
        first_year: 2013,
        last_year: None,
        ..landsat4_toa()
    }
}

fn landsat8_sr() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Landsat8Sr,
        process: ProcessLevel::Sr,
        short_name: "L8SR",
        code: 11,
        bands: oli_bands(10_000.0),
        qa: Some(QaEncoding::PIXEL_QA),
        ..landsat8_toa()
    }
}

fn sentinel2_toa() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Sentinel2Toa,
        family: Family::Sentinel,
        process: ProcessLevel::Toa,
        short_name: "S2",
        code: 12,
        bands: vec![
            reflectance(BLUE, "B2", 10.0, 10_000.0),
            reflectance(GREEN, "B3", 10.0, 10_000.0),
            reflectance(RED, "B4", 10.0, 10_000.0),
            reflectance(NIR, "B8", 10.0, 10_000.0),
            reflectance(SWIR, "B11", 20.0, 10_000.0),
            reflectance(SWIR2, "B12", 20.0, 10_000.0),
        ],
        scale: 10.0,
        cloud_cover: Some("CLOUD_COVERAGE_ASSESSMENT"),
        qa: Some(QaEncoding::QA60),
        first_year: 2015,
        last_year: None,
    }
}

fn sentinel2_sr() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::Sentinel2Sr,
        process: ProcessLevel::Sr,
        short_name: "S2SR",
        code: 13,
        first_year: 2017,
        ..sentinel2_toa()
    }
}

fn modis_terra() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::ModisTerra,
        family: Family::Modis,
        process: ProcessLevel::Sr,
        short_name: "MODT",
        code: 14,
        bands: vec![
            reflectance(BLUE, "sur_refl_b03", 500.0, 5_000.0),
            reflectance(GREEN, "sur_refl_b04", 500.0, 5_000.0),
            reflectance(RED, "sur_refl_b01", 500.0, 5_000.0),
            reflectance(NIR, "sur_refl_b02", 500.0, 5_000.0),
            reflectance(SWIR, "sur_refl_b06", 500.0, 5_000.0),
            reflectance(SWIR2, "sur_refl_b07", 500.0, 5_000.0),
        ],
        scale: 500.0,
        cloud_cover: None,
        qa: Some(QaEncoding::MODIS_STATE),
        first_year: 1999,
        last_year: None,
    }
}

fn modis_aqua() -> SensorDescriptor {
    SensorDescriptor {
        id: SensorId::ModisAqua,
        short_name: "MODAQ",
        code: 15,
        first_year: 2002,
        ..modis_terra()
    }
}

static CATALOG: LazyLock<Vec<SensorDescriptor>> = LazyLock::new(|| {
    vec![
        landsat1(),
        landsat2(),
        landsat3(),
        landsat4_toa(),
        landsat4_sr(),
        landsat5_toa(),
        landsat5_sr(),
        landsat7_toa(),
        landsat7_sr(),
        landsat8_toa(),
        landsat8_sr(),
        sentinel2_toa(),
        sentinel2_sr(),
        modis_terra(),
        modis_aqua(),
    ]
});

pub fn descriptor_for(id: SensorId) -> &'static SensorDescriptor {
    &CATALOG[id.index()]
}

/// Canonical bands present in every one of `sensors`, in schema order.
pub fn common_bands(sensors: &[SensorId]) -> Vec<&'static str> {
    CANONICAL_BANDS
        .into_iter()
        .filter(|band| sensors.iter().all(|s| s.descriptor().band(band).is_some()))
        .collect()
}
