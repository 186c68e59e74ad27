//! Candidate artifact paths and cleanup.
//!
//! A candidate for `dir/logo.png` lives at `dir/logo.png.temp.png`: same
//! directory (so the final rename stays on one filesystem) and the original
//! extension last (so encoders still infer the format from it).
//!
//! The name is fixed per asset path. Two runs over the same directory at the
//! same time will race on it; nothing here locks.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const TEMP_MARKER: &str = ".temp";

/// Derive the candidate path for an asset.
pub fn candidate_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(TEMP_MARKER);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

/// Check whether `path` looks like a candidate produced by [`candidate_path`].
pub fn is_candidate_path(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    match path.extension().and_then(|e| e.to_str()) {
        // candidate of an extensionless file
        Some("temp") => true,
        Some(ext) => {
            let suffix = format!("{TEMP_MARKER}.{ext}");
            name.strip_suffix(&suffix)
                .is_some_and(|base| base.ends_with(&format!(".{ext}")))
        }
        None => false,
    }
}

/// A candidate artifact on disk, removed on drop unless committed.
#[derive(Debug)]
pub struct Candidate {
    path: PathBuf,
    armed: bool,
}

impl Candidate {
    /// Reserve the candidate path for `asset`. Nothing is created yet.
    pub fn for_asset(asset: &Path) -> Self {
        Self {
            path: candidate_path(asset),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the written candidate in bytes.
    pub fn size(&self) -> io::Result<u64> {
        fs::metadata(&self.path).map(|m| m.len())
    }

    /// Atomically move the candidate over `target`.
    ///
    /// On failure the candidate is still removed on drop.
    pub fn commit(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for Candidate {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => crate::log!("error"; "could not remove {}: {}", self.path.display(), e),
        }
    }
}
