//! Asset format detection.

use std::path::Path;

use image::ImageFormat;

/// Content format of an asset, inferred from its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    Png,
    /// `.jpg` and `.jpeg`.
    Jpeg,
    Webp,
    Pdf,
}

impl AssetFormat {
    /// Raster formats picked up by the image jobs.
    pub const RASTER: [Self; 3] = [Self::Png, Self::Jpeg, Self::Webp];

    /// Detect format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    /// Detect format from a bare extension without the dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Whether this is a raster image format.
    pub fn is_raster(self) -> bool {
        !matches!(self, Self::Pdf)
    }

    /// Codec format for raster assets.
    pub fn image_format(self) -> Option<ImageFormat> {
        match self {
            Self::Png => Some(ImageFormat::Png),
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Webp => Some(ImageFormat::WebP),
            Self::Pdf => None,
        }
    }

    /// Short lowercase name for log output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Pdf => "pdf",
        }
    }
}
