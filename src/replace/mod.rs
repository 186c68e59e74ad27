//! Size-gated, in-place asset replacement.
//!
//! Every optimization goes through the same gate:
//!
//! 1. measure the asset
//! 2. write a candidate next to it ([`candidate_path`])
//! 3. measure the candidate
//! 4. strictly smaller: rename the candidate over the asset (one atomic step);
//!    otherwise delete the candidate
//!
//! Whatever happens, the asset path holds either the original or the smaller
//! candidate, and no candidate file survives the call.
//!
//! Strategies implement [`Transform`]. [`Gate::run_chain`] runs an ordered
//! list of them, each gated against what the previous ones left on disk.

mod candidate;

pub use candidate::{Candidate, candidate_path, is_candidate_path};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::debug;
use crate::report::{AssetOutcome, error_chain};

/// A way to produce a candidate for an asset.
pub trait Transform {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Reason this strategy does not apply to `source`, if any.
    ///
    /// A skip is not an error: the asset is left alone by this strategy.
    fn skip_reason(&self, _source: &Path) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Read `source` and write the candidate to `candidate`.
    ///
    /// Must not touch `source`.
    fn apply(&self, source: &Path, candidate: &Path) -> anyhow::Result<()>;
}

/// Errors from a single gated replacement.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("`{0}` not found")]
    NotFound(PathBuf),

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("{strategy} failed on `{}`", path.display())]
    Transform {
        strategy: &'static str,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result of one gated replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replacement {
    /// Asset size before the call.
    pub original_size: u64,
    /// Size at the asset path after the call (the candidate's, if it won).
    pub final_size: u64,
    /// The candidate won. In a dry run the asset is untouched anyway.
    pub replaced: bool,
}

/// The size gate, optionally in dry-run mode.
///
/// A dry run builds and measures every candidate but never renames one over
/// the original.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gate {
    dry_run: bool,
}

impl Gate {
    pub const fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Replace `path` with the output of `transform` if that is strictly smaller.
    pub fn replace_if_smaller(
        &self,
        path: &Path,
        transform: &dyn Transform,
    ) -> Result<Replacement, ReplaceError> {
        let original_size = file_size(path)?;

        let candidate = Candidate::for_asset(path);
        transform
            .apply(path, candidate.path())
            .map_err(|err| ReplaceError::Transform {
                strategy: transform.name(),
                path: path.to_path_buf(),
                source: err.into(),
            })?;

        let candidate_size = candidate
            .size()
            .map_err(|err| ReplaceError::Io(candidate.path().to_path_buf(), err))?;

        debug!(
            "replace";
            "{} {}: {} -> {} bytes",
            transform.name(),
            path.display(),
            original_size,
            candidate_size
        );

        if candidate_size >= original_size {
            return Ok(Replacement {
                original_size,
                final_size: original_size,
                replaced: false,
            });
        }

        if !self.dry_run {
            candidate
                .commit(path)
                .map_err(|err| ReplaceError::Io(path.to_path_buf(), err))?;
        }

        Ok(Replacement {
            original_size,
            final_size: candidate_size,
            replaced: true,
        })
    }

    /// Run `strategies` in order against `path`, each one size-gated.
    ///
    /// A failing strategy stops the chain for this asset only; replacements
    /// made by earlier strategies stay on disk.
    pub fn run_chain(&self, path: &Path, strategies: &[Box<dyn Transform>]) -> AssetOutcome {
        if !path.exists() {
            return AssetOutcome::skipped("not found");
        }

        let mut before = None;
        let mut best: Option<u64> = None;
        let mut replaced = false;
        let mut skips = Vec::new();

        for strategy in strategies {
            match strategy.skip_reason(path) {
                Ok(Some(reason)) => {
                    debug!("replace"; "{} skipped {}: {}", strategy.name(), path.display(), reason);
                    skips.push(reason);
                    continue;
                }
                Ok(None) => {}
                Err(err) => return chain_failure(strategy.name(), &format!("{err:#}"), replaced),
            }

            match self.replace_if_smaller(path, strategy.as_ref()) {
                Ok(step) => {
                    before.get_or_insert(step.original_size);
                    replaced |= step.replaced;
                    best = Some(best.map_or(step.final_size, |b| b.min(step.final_size)));
                }
                Err(ReplaceError::NotFound(_)) => return AssetOutcome::skipped("not found"),
                Err(err) => return chain_failure(strategy.name(), &error_chain(&err), replaced),
            }
        }

        match (before, best) {
            (Some(before), Some(after)) if replaced => AssetOutcome::Replaced { before, after },
            (_, Some(size)) => AssetOutcome::Kept { size },
            _ if skips.is_empty() => AssetOutcome::skipped("no applicable strategy"),
            _ => AssetOutcome::skipped(skips.join("; ")),
        }
    }
}

/// Replace `path` with the output of `transform` if that is strictly smaller.
///
/// Shorthand for a non-dry-run [`Gate`].
pub fn replace_if_smaller(
    path: &Path,
    transform: &dyn Transform,
) -> Result<Replacement, ReplaceError> {
    Gate::default().replace_if_smaller(path, transform)
}

fn file_size(path: &Path) -> Result<u64, ReplaceError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(ReplaceError::NotFound(path.to_path_buf()))
        }
        Err(err) => Err(ReplaceError::Io(path.to_path_buf(), err)),
    }
}

fn chain_failure(strategy: &str, detail: &str, replaced_earlier: bool) -> AssetOutcome {
    if replaced_earlier {
        AssetOutcome::failed(format!("{strategy}: {detail} (earlier rewrite kept)"))
    } else {
        AssetOutcome::failed(detail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use tempfile::TempDir;

    /// Writes a fixed payload as the candidate.
    struct Fixed(&'static [u8]);

    impl Transform for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn apply(&self, _source: &Path, candidate: &Path) -> anyhow::Result<()> {
            fs::write(candidate, self.0)?;
            Ok(())
        }
    }

    /// Writes a partial candidate, then fails.
    struct Broken;

    impl Transform for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn apply(&self, _source: &Path, candidate: &Path) -> anyhow::Result<()> {
            fs::write(candidate, b"partial")?;
            bail!("encoder exploded")
        }
    }

    struct NeverApplies;

    impl Transform for NeverApplies {
        fn name(&self) -> &'static str {
            "never"
        }

        fn skip_reason(&self, _source: &Path) -> anyhow::Result<Option<String>> {
            Ok(Some("not my kind".into()))
        }

        fn apply(&self, _source: &Path, _candidate: &Path) -> anyhow::Result<()> {
            unreachable!("skipped strategies are never applied")
        }
    }

    fn asset(dir: &TempDir, contents: &[u8]) -> PathBuf {
        let path = dir.path().join("asset.png");
        fs::write(&path, contents).unwrap();
        path
    }

    fn no_candidates_left(dir: &TempDir) -> bool {
        fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .all(|e| !is_candidate_path(&e.path()))
    }

    #[test]
    fn test_smaller_candidate_replaces() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123456789");

        let result = replace_if_smaller(&path, &Fixed(b"0123")).unwrap();

        assert_eq!(
            result,
            Replacement {
                original_size: 10,
                final_size: 4,
                replaced: true
            }
        );
        assert_eq!(fs::read(&path).unwrap(), b"0123");
        assert!(no_candidates_left(&dir));
    }

    #[test]
    fn test_equal_candidate_keeps_original() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123456789");

        let result = replace_if_smaller(&path, &Fixed(b"abcdefghij")).unwrap();

        assert!(!result.replaced);
        assert_eq!(result.final_size, 10);
        assert_eq!(fs::read(&path).unwrap(), b"0123456789");
        assert!(no_candidates_left(&dir));
    }

    #[test]
    fn test_larger_candidate_keeps_original() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123");

        let result = replace_if_smaller(&path, &Fixed(b"0123456789")).unwrap();

        assert!(!result.replaced);
        assert_eq!(fs::read(&path).unwrap(), b"0123");
        assert!(no_candidates_left(&dir));
    }

    #[test]
    fn test_missing_path_is_not_found_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.png");

        let err = replace_if_smaller(&path, &Fixed(b"x")).unwrap_err();

        assert!(matches!(err, ReplaceError::NotFound(p) if p == path));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_transform_cleans_up() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"original");

        let err = replace_if_smaller(&path, &Broken).unwrap_err();

        assert!(matches!(err, ReplaceError::Transform { strategy: "broken", .. }));
        assert_eq!(
            error_chain(&err),
            format!("broken failed on `{}`: encoder exploded", path.display())
        );
        assert_eq!(fs::read(&path).unwrap(), b"original");
        assert!(no_candidates_left(&dir));
    }

    #[test]
    fn test_dry_run_never_touches_asset() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123456789");

        let result = Gate::new(true).replace_if_smaller(&path, &Fixed(b"01")).unwrap();

        assert!(result.replaced);
        assert_eq!(result.final_size, 2);
        assert_eq!(fs::read(&path).unwrap(), b"0123456789");
        assert!(no_candidates_left(&dir));
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123456789");

        assert!(replace_if_smaller(&path, &Fixed(b"0123")).unwrap().replaced);
        assert!(!replace_if_smaller(&path, &Fixed(b"0123")).unwrap().replaced);
        assert_eq!(fs::read(&path).unwrap(), b"0123");
    }

    #[test]
    fn test_chain_gates_each_step_against_current_size() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123456789");
        let chain: Vec<Box<dyn Transform>> = vec![
            Box::new(Fixed(b"012345")),
            Box::new(Fixed(b"0123456")),
            Box::new(Fixed(b"012")),
        ];

        let outcome = Gate::default().run_chain(&path, &chain);

        assert_eq!(outcome, AssetOutcome::Replaced { before: 10, after: 3 });
        assert_eq!(fs::read(&path).unwrap(), b"012");
        assert!(no_candidates_left(&dir));
    }

    #[test]
    fn test_chain_all_skipped() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123456789");
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(NeverApplies)];

        let outcome = Gate::default().run_chain(&path, &chain);
        assert_eq!(outcome, AssetOutcome::skipped("not my kind"));
    }

    #[test]
    fn test_chain_failure_keeps_earlier_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = asset(&dir, b"0123456789");
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(Fixed(b"01")), Box::new(Broken)];

        let outcome = Gate::default().run_chain(&path, &chain);

        assert!(matches!(outcome, AssetOutcome::Failed { ref error } if error.contains("earlier rewrite kept")));
        assert_eq!(fs::read(&path).unwrap(), b"01");
        assert!(no_candidates_left(&dir));
    }

    #[test]
    fn test_chain_missing_asset() {
        let dir = TempDir::new().unwrap();
        let chain: Vec<Box<dyn Transform>> = vec![Box::new(Fixed(b"x"))];

        let outcome = Gate::default().run_chain(&dir.path().join("gone.png"), &chain);
        assert_eq!(outcome, AssetOutcome::skipped("not found"));
    }
}
