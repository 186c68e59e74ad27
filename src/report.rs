//! Per-asset outcomes and run summary.

use std::path::{Path, PathBuf};

use crate::{debug, log};
use crate::utils::fmt::{format_size, percent_saved, plural_count};

/// What happened to one asset in one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    /// A smaller candidate replaced the original (or would have, in a dry run).
    Replaced { before: u64, after: u64 },
    /// Every candidate was at least as large; the original was kept.
    Kept { size: u64 },
    /// No strategy applied to the asset, or it was missing.
    Skipped { reason: String },
    /// A strategy failed; the original was left untouched.
    Failed { error: String },
}

impl AssetOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Bytes saved by this outcome.
    pub fn saved(&self) -> u64 {
        match self {
            Self::Replaced { before, after } => before.saturating_sub(*after),
            _ => 0,
        }
    }
}

/// Ordered record of every asset a run touched.
#[derive(Debug, Default)]
pub struct RunSummary {
    entries: Vec<(PathBuf, AssetOutcome)>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: impl Into<PathBuf>, outcome: AssetOutcome) {
        self.entries.push((path.into(), outcome));
    }

    /// Append all entries of another summary.
    pub fn merge(&mut self, other: RunSummary) {
        self.entries.extend(other.entries);
    }

    /// Outcome recorded for `path`, the last one if recorded twice.
    pub fn outcome(&self, path: &Path) -> Option<&AssetOutcome> {
        self.entries
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, o)| o)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn replaced(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Replaced { .. }))
    }

    pub fn kept(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Kept { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AssetOutcome::Failed { .. }))
    }

    /// Total bytes saved across all replaced assets.
    pub fn bytes_saved(&self) -> u64 {
        self.entries.iter().map(|(_, o)| o.saved()).sum()
    }

    fn count(&self, pred: impl Fn(&AssetOutcome) -> bool) -> usize {
        self.entries.iter().filter(|(_, o)| pred(o)).count()
    }

    /// Print a one-line summary of the run.
    pub fn log_summary(&self, dry_run: bool) {
        if self.is_empty() {
            log!("done"; "no assets processed");
            return;
        }
        debug!("done"; "{} outcomes recorded", self.len());

        let verb = if dry_run { "would shrink" } else { "shrunk" };
        let before: u64 = self
            .entries
            .iter()
            .map(|(_, o)| match o {
                AssetOutcome::Replaced { before, .. } => *before,
                _ => 0,
            })
            .sum();
        let saved = self.bytes_saved();

        log!(
            "done";
            "{} {}, kept {}, skipped {}, failed {}; saved {} ({:.1}%)",
            verb,
            plural_count(self.replaced(), "asset"),
            self.kept(),
            self.skipped(),
            self.failed(),
            format_size(saved),
            percent_saved(before, before - saved)
        );
    }
}

/// Render an error with its full source chain: `outer: inner: root`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
