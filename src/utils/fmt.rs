//! Formatting helpers for console output.

/// Bytes in one mebibyte.
const MIB: f64 = 1024.0 * 1024.0;

/// Format a byte count as megabytes with two decimals.
///
/// # Examples
///
/// - `format_mb(0)` -> `"0.00MB"`
/// - `format_mb(5 * 1024 * 1024)` -> `"5.00MB"`
#[allow(clippy::cast_precision_loss)] // display only
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / MIB)
}

/// Format a byte count with the most readable unit (B, KB, MB).
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    match bytes {
        b if b < 1024 => format!("{b}B"),
        b if b < 1024 * 1024 => format!("{:.1}KB", b as f64 / 1024.0),
        b => format_mb(b),
    }
}

/// Percentage of `before` saved by shrinking it to `after`.
#[allow(clippy::cast_precision_loss)]
pub fn percent_saved(before: u64, after: u64) -> f64 {
    if before == 0 || after >= before {
        return 0.0;
    }
    (before - after) as f64 * 100.0 / before as f64
}

/// Format count with noun, handling pluralization
///
/// - `plural_count(0, "file")` -> `"0 files"`
/// - `plural_count(1, "file")` -> `"1 file"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
