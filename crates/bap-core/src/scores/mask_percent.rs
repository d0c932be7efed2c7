//! Unmasked-pixel coverage, over the site and over a moving kernel.

use serde::{Deserialize, Serialize};

use super::{map_image_score, ImageScore, Score, ScoreCommon, ScoreContext};
use crate::consts::{MASK_PERCENT_DECIMALS, MASK_PERCENT_SLEEP_MS, MAX_KERNEL_RADIUS};
use crate::error::{BapError, Result};
use crate::image::{Band, Image, Rect};
use crate::kernel::{neighbourhood_count, KernelShape};
use crate::query::Query;

pub const DEFAULT_MASK_PERCENT_NAME: &str = "score-maskper";
pub const DEFAULT_MASK_KERNEL_NAME: &str = "score-maskper-kernel";

fn default_kernel_radius() -> usize {
    MAX_KERNEL_RADIUS
}

fn trim(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).trunc() / factor
}

/// Share of valid pixels inside the site region, as a constant band.
///
/// The value is also written to the image property named after the score
/// so that [`FilterConfig::MaskCover`](crate::filters::FilterConfig) can
/// act on it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskPercent {
    #[serde(flatten)]
    pub common: ScoreCommon,
    /// Count zero-valued pixels of the first band as masked.
    #[serde(default)]
    pub count_zeros: bool,
}

impl MaskPercent {
    /// Coverage in `[0, 1]`, truncated to four decimals.
    pub fn coverage(&self, image: &Image, ctx: &ScoreContext) -> f64 {
        let Some((_, band)) = image.bands.first() else {
            return 0.0;
        };
        let (h, w) = band.dim();
        let grid = Rect::new(0, 0, h, w);
        let Some(area) = ctx.region.intersection(&grid) else {
            return 0.0;
        };
        let total = area.area();
        if total == 0 {
            return 0.0;
        }
        let mut valid = 0usize;
        for row in area.row..area.row + area.rows {
            for col in area.col..area.col + area.cols {
                let ok = band.mask[[row, col]] && !(self.count_zeros && band.data[[row, col]] == 0.0);
                if ok {
                    valid += 1;
                }
            }
        }
        let masked = (total - valid) as f64 / total as f64;
        1.0 - trim(masked, MASK_PERCENT_DECIMALS)
    }
}

impl Score for MaskPercent {
    fn default_name(&self) -> &'static str {
        DEFAULT_MASK_PERCENT_NAME
    }

    fn default_sleep_ms(&self) -> u64 {
        MASK_PERCENT_SLEEP_MS
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        let score = self.clone();
        let ctx = ctx.clone();
        let name = score.name().to_string();
        query.map(format!("score {name}"), move |mut img| {
            let value = score.coverage(&img, &ctx);
            let shape = ctx.image_shape(&img);
            img.add_band(name.as_str(), score.common.adjust(Band::constant(shape, value as f32)));
            img.set_property(name.as_str(), value);
            Ok(img)
        })
    }
}

impl ImageScore for MaskPercent {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let value = self.coverage(image, ctx);
        Ok(Band::constant(ctx.image_shape(image), value as f32))
    }
}

/// Per-pixel share of valid pixels inside a kernel neighbourhood.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskPercentKernel {
    #[serde(flatten)]
    pub common: ScoreCommon,
    #[serde(default)]
    pub kernel: KernelShape,
    /// Kernel radius in pixels, capped to 255.
    #[serde(default = "default_kernel_radius")]
    pub radius: usize,
}

impl Default for MaskPercentKernel {
    fn default() -> Self {
        Self {
            common: ScoreCommon::default(),
            kernel: KernelShape::default(),
            radius: default_kernel_radius(),
        }
    }
}

impl MaskPercentKernel {
    pub fn effective_radius(&self) -> usize {
        self.radius.min(MAX_KERNEL_RADIUS)
    }
}

impl Score for MaskPercentKernel {
    fn default_name(&self) -> &'static str {
        DEFAULT_MASK_KERNEL_NAME
    }

    fn common(&self) -> &ScoreCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ScoreCommon {
        &mut self.common
    }

    fn validate(&self) -> Result<()> {
        self.common.validate(self.name())?;
        if self.radius == 0 {
            return Err(BapError::InvalidScore {
                name: self.name().to_string(),
                reason: "kernel radius must be at least 1".into(),
            });
        }
        Ok(())
    }

    fn map(&self, query: Query, ctx: &ScoreContext) -> Query {
        map_image_score(self, query, ctx)
    }
}

impl ImageScore for MaskPercentKernel {
    fn compute(&self, image: &Image, ctx: &ScoreContext) -> Result<Band> {
        let Some(mask) = image.mask() else {
            return Ok(Band::constant(ctx.image_shape(image), 0.0));
        };
        let radius = self.effective_radius();
        let cells = self.kernel.cell_count(radius) as f32;
        let counts = neighbourhood_count(mask, self.kernel, radius);
        Ok(Band::new(counts.mapv(|c| c / cells)))
    }
}

#[cfg(test)]
mod tests {
    use super::trim;

    #[test]
    fn test_trim_truncates() {
        assert_eq!(trim(0.123_456, 4), 0.1234);
        assert_eq!(trim(0.999_99, 4), 0.9999);
        assert_eq!(trim(1.0, 4), 1.0);
    }
}
