//! Asset discovery: format detection and directory scanning.

mod kind;
mod scan;

pub use kind::AssetFormat;
pub use scan::scan_assets;
