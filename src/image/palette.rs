//! PNG palette reduction.
//!
//! Quantizes truecolor PNGs to a fixed-size palette with NeuQuant (a
//! self-organizing network that places palette entries where the image's
//! colors are dense) and writes an indexed PNG. Works well for logos and
//! icons; photos usually come out larger and are dropped by the size gate.
//!
//! PNGs already stored as indexed color are skipped, even when their palette
//! is larger than the configured size.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use color_quant::NeuQuant;
use image::RgbaImage;

use crate::asset::AssetFormat;
use crate::debug;
use crate::replace::Transform;

use super::header::{is_animated, png_info};
use super::optimize::decode;

/// Quantize a PNG to at most `colors` palette entries.
#[derive(Debug, Clone, Copy)]
pub struct PaletteReduce {
    pub colors: usize,
    /// NeuQuant sampling factor: 1 = every pixel (slow, best), 30 = fastest.
    pub sample_factor: i32,
}

impl Transform for PaletteReduce {
    fn name(&self) -> &'static str {
        "palette"
    }

    fn skip_reason(&self, source: &Path) -> Result<Option<String>> {
        if AssetFormat::from_path(source) != Some(AssetFormat::Png) {
            return Ok(Some("palette reduction is png-only".into()));
        }
        if is_animated(source, AssetFormat::Png)? {
            return Ok(Some("animated image".into()));
        }
        if is_indexed_png(source)? {
            return Ok(Some("already palette-indexed".into()));
        }
        Ok(None)
    }

    fn apply(&self, source: &Path, candidate: &Path) -> Result<()> {
        let rgba = decode(source, AssetFormat::Png)?.to_rgba8();
        let indexed = quantize(&rgba, self.colors, self.sample_factor);
        debug!("palette"; "{}: {} colors", source.display(), indexed.palette_len());
        indexed.write_png(candidate)
    }
}

/// Whether the PNG at `path` stores palette indices.
pub fn is_indexed_png(path: &Path) -> Result<bool> {
    Ok(png_info(path)?.color_type == png::ColorType::Indexed)
}

/// An image reduced to palette indices.
#[derive(Debug, Clone)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    /// RGB triplets, one per palette entry.
    pub palette: Vec<u8>,
    /// Alpha per palette entry, trailing opaque entries trimmed (tRNS layout).
    pub alpha: Vec<u8>,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
}

impl IndexedImage {
    /// Number of palette entries.
    pub fn palette_len(&self) -> usize {
        self.palette.len() / 3
    }

    /// Write as an 8-bit indexed PNG at best compression.
    pub fn write_png(&self, output: &Path) -> Result<()> {
        let file = File::create(output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        let mut out = BufWriter::new(file);

        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(self.palette.clone());
            if !self.alpha.is_empty() {
                encoder.set_trns(self.alpha.clone());
            }
            encoder.set_compression(png::Compression::Best);

            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.indices)?;
            writer.finish()?;
        }

        out.flush()?;
        Ok(())
    }
}

/// Quantize RGBA pixels to at most `colors` entries.
#[allow(clippy::cast_possible_truncation)] // colors <= 256, so indices fit in u8
pub fn quantize(rgba: &RgbaImage, colors: usize, sample_factor: i32) -> IndexedImage {
    let pixels = rgba.as_raw();
    let quant = NeuQuant::new(sample_factor, colors, pixels);

    let indices = pixels
        .chunks_exact(4)
        .map(|px| quant.index_of(px) as u8)
        .collect();

    let map = quant.color_map_rgba();
    let palette = map
        .chunks_exact(4)
        .flat_map(|c| [c[0], c[1], c[2]])
        .collect();
    let mut alpha: Vec<u8> = map.chunks_exact(4).map(|c| c[3]).collect();
    while alpha.last() == Some(&u8::MAX) {
        alpha.pop();
    }

    IndexedImage {
        width: rgba.width(),
        height: rgba.height(),
        palette,
        alpha,
        indices,
    }
}
