//! Process-wide state shared across jobs.

mod state;

pub use state::{is_shutdown, setup_shutdown_handler};
