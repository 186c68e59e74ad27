//! Raster image strategies.
//!
//! # Modules
//!
//! - [`optimize`]: downscale to a max width, re-encode in the same format
//! - [`lossless`]: oxipng recompression of PNGs, pixels untouched
//! - [`palette`]: quantize PNGs to an indexed palette
//! - `encode`: per-format encoder settings
//! - `header`: animation and color-type checks before decoding

mod encode;
mod header;
pub mod lossless;
pub mod optimize;
pub mod palette;

pub use lossless::LosslessPng;
pub use optimize::OptimizeImage;
pub use palette::PaletteReduce;
