//! Global process state.
//!
//! - `SHUTDOWN`: Has shutdown been requested? (Ctrl+C received)
//!
//! Jobs check the flag between assets, so the asset being processed when
//! Ctrl+C arrives is finished (and its candidate cleaned up) before exit.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler.
///
/// A second Ctrl+C exits immediately.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        if SHUTDOWN.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        crate::log!("shrink"; "stopping after the current asset...");
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Check if shutdown was requested
#[inline]
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
