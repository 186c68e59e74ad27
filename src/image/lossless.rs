//! Lossless PNG recompression with oxipng.
//!
//! Tries filter and deflate combinations and lossless color-type reductions
//! without changing a single pixel. Safe ancillary chunks are stripped.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use oxipng::{Options, StripChunks};

use crate::asset::AssetFormat;
use crate::replace::Transform;

use super::header::is_animated;

/// Recompress a PNG losslessly at an oxipng preset level (0-6).
#[derive(Debug, Clone, Copy)]
pub struct LosslessPng {
    pub level: u8,
}

impl Transform for LosslessPng {
    fn name(&self) -> &'static str {
        "oxipng"
    }

    fn skip_reason(&self, source: &Path) -> Result<Option<String>> {
        if AssetFormat::from_path(source) != Some(AssetFormat::Png) {
            return Ok(Some("lossless pass is png-only".into()));
        }
        if is_animated(source, AssetFormat::Png)? {
            return Ok(Some("animated image".into()));
        }
        Ok(None)
    }

    fn apply(&self, source: &Path, candidate: &Path) -> Result<()> {
        let data = fs::read(source).with_context(|| format!("failed to read {}", source.display()))?;

        let mut options = Options::from_preset(self.level);
        options.strip = StripChunks::Safe;
        let optimized = oxipng::optimize_from_memory(&data, &options)
            .map_err(|err| anyhow!("oxipng failed on {}: {err}", source.display()))?;

        fs::write(candidate, optimized)
            .with_context(|| format!("failed to write {}", candidate.display()))
    }
}
