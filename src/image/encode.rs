//! Re-encoding decoded images in their original format.
//!
//! Encoders never copy metadata over, so every re-encode also strips EXIF,
//! text chunks, and color profiles.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage};

use crate::asset::AssetFormat;

/// Encode `img` as `format` into a new file at `output`.
///
/// `quality` only affects JPEG. PNG always uses the strongest compression
/// with adaptive filtering; WebP is lossless (the only WebP encoder available).
pub fn encode_to_path(
    img: &DynamicImage,
    format: AssetFormat,
    quality: u8,
    output: &Path,
) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        AssetFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut writer, CompressionType::Best, PngFilter::Adaptive);
            img.write_with_encoder(encoder)?;
        }
        AssetFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            jpeg_compatible(img).write_with_encoder(encoder)?;
        }
        AssetFormat::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut writer);
            webp_compatible(img).write_with_encoder(encoder)?;
        }
        AssetFormat::Pdf => anyhow::bail!("pdf is not a raster format"),
    }

    writer.flush()?;
    Ok(())
}

/// JPEG has no alpha and no 16-bit samples.
fn jpeg_compatible(img: &DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::L8 | ColorType::Rgb8 => img.clone(),
        ColorType::La8 | ColorType::L16 | ColorType::La16 => DynamicImage::ImageLuma8(img.to_luma8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

/// The lossless WebP encoder takes 8-bit RGB(A) only.
fn webp_compatible(img: &DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::Rgb8 | ColorType::Rgba8 => img.clone(),
        color if color.has_alpha() => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}
