//! Shrink - size-gated, in-place optimization of image and PDF assets.

mod asset;
mod cli;
mod config;
mod core;
mod image;
mod logger;
mod pdf;
mod replace;
mod report;
mod run;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ShrinkConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = ShrinkConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("config"; "loaded {}", path.display());
    }
    if config.dry_run {
        log!("shrink"; "dry run, nothing will be replaced");
    }

    let summary = match cli.resolved_command() {
        Commands::Images { .. } => run::optimize_images(&config),
        Commands::Palette => run::fix_palettes(&config),
        Commands::Pdf { .. } => run::compress_pdfs(&config),
        Commands::All => run::run_all(&config),
    };

    summary.log_summary(config.dry_run);
    Ok(())
}
