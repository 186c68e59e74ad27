use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::asset::AssetFormat;
use crate::debug;
use crate::replace::Transform;

use super::encode::encode_to_path;
use super::header::is_animated;
use super::palette::is_indexed_png;

/// General raster optimization: downscale to a maximum width, then re-encode
/// in the original format.
#[derive(Debug, Clone, Copy)]
pub struct OptimizeImage {
    pub max_width: u32,
    pub quality: u8,
}

impl Transform for OptimizeImage {
    fn name(&self) -> &'static str {
        "optimize"
    }

    fn skip_reason(&self, source: &Path) -> Result<Option<String>> {
        let Some(format) = AssetFormat::from_path(source).filter(|f| f.is_raster()) else {
            return Ok(Some("not a raster image".into()));
        };
        if is_animated(source, format)? {
            return Ok(Some("animated image".into()));
        }
        // A truecolor re-encode would lose the palette.
        if format == AssetFormat::Png && is_indexed_png(source)? {
            return Ok(Some("already palette-indexed".into()));
        }
        Ok(None)
    }

    fn apply(&self, source: &Path, candidate: &Path) -> Result<()> {
        let format = AssetFormat::from_path(source)
            .filter(|f| f.is_raster())
            .with_context(|| format!("unsupported image type: {}", source.display()))?;

        let img = decode(source, format)?;
        let img = fit_width(img, self.max_width);
        encode_to_path(&img, format, self.quality, candidate)
    }
}

/// Decode using the format named by the extension.
pub(super) fn decode(source: &Path, format: AssetFormat) -> Result<DynamicImage> {
    let mut reader = ImageReader::open(source)
        .with_context(|| format!("failed to open {}", source.display()))?;
    if let Some(image_format) = format.image_format() {
        reader.set_format(image_format);
    }
    reader
        .decode()
        .with_context(|| format!("failed to decode {}", source.display()))
}

/// Downscale proportionally (Lanczos3) when wider than `max_width`.
pub fn fit_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= max_width {
        return img;
    }

    let new_height = scaled_height(width, height, max_width);
    debug!("resize"; "{}x{} -> {}x{}", width, height, max_width, new_height);
    img.resize_exact(max_width, new_height, FilterType::Lanczos3)
}

/// `floor(height * max_width / width)`, at least 1.
#[allow(clippy::cast_possible_truncation)] // result <= height
fn scaled_height(width: u32, height: u32, max_width: u32) -> u32 {
    let scaled = u64::from(height) * u64::from(max_width) / u64::from(width);
    (scaled as u32).max(1)
}
