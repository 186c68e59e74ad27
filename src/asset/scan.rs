//! Asset scanning (pure, no side effects).

use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use crate::debug;
use crate::replace::is_candidate_path;

use super::AssetFormat;

/// A file selected for optimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: PathBuf,
    pub format: AssetFormat,
}

impl Asset {
    /// Build an asset from a path, if its extension is a known format.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = AssetFormat::from_path(&path)?;
        Some(Self { path, format })
    }
}

/// Recursively collect files under `root` whose format is in `formats`.
///
/// Walks serially in sorted order so runs are deterministic. Hidden files
/// are included. Leftover candidate artifacts (`*.temp.*`) from an
/// interrupted run are never returned as assets.
pub fn scan_assets(root: &Path, formats: &[AssetFormat]) -> Vec<Asset> {
    WalkDir::new(root)
        .sort(true)
        .skip_hidden(false)
        .parallelism(Parallelism::Serial)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            if is_candidate_path(&path) {
                debug!("scan"; "ignoring leftover candidate {}", path.display());
                return None;
            }
            Asset::from_path(path)
        })
        .filter(|asset| formats.contains(&asset.format))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_scan_filters_by_format() {
        let dir = TempDir::new().unwrap();
        let png = touch(dir.path(), "img/logo.png");
        let jpg = touch(dir.path(), "img/nested/photo.JPG");
        touch(dir.path(), "css/site.css");
        touch(dir.path(), "brochure.pdf");

        let found = scan_assets(dir.path(), &AssetFormat::RASTER);
        let paths: Vec<_> = found.iter().map(|a| a.path.clone()).collect();

        assert_eq!(found.len(), 2);
        assert!(paths.contains(&png));
        assert!(paths.contains(&jpg));
    }

    #[test]
    fn test_scan_skips_leftover_candidates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "logo.png");
        touch(dir.path(), "logo.png.temp.png");

        let found = scan_assets(dir.path(), &[AssetFormat::Png]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, dir.path().join("logo.png"));
    }

    #[test]
    fn test_scan_includes_hidden_and_is_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.png");
        touch(dir.path(), ".cache/c.png");

        let found = scan_assets(dir.path(), &[AssetFormat::Png]);
        let names: Vec<_> = found
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(found.len(), 3);
        assert!(names.contains(&"c.png".to_string()));
        let a = names.iter().position(|n| n == "a.png").unwrap();
        let b = names.iter().position(|n| n == "b.png").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(scan_assets(&dir.path().join("missing"), &AssetFormat::RASTER).is_empty());
    }
}
