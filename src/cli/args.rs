//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Shrink image and PDF assets in place, keeping a rewrite only when it is smaller
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: nearest shrink.toml, optional)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Asset directory to scan recursively
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Downscale images wider than this (pixels)
    #[arg(long, global = true)]
    pub max_width: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(short, long, global = true)]
    pub quality: Option<u8>,

    /// Palette size for PNG quantization (2-256)
    #[arg(long, global = true)]
    pub colors: Option<usize>,

    /// Build and measure candidates, but never replace anything
    #[arg(short = 'n', long, global = true)]
    pub dry_run: bool,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (default: all)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resize and re-encode png/jpeg/webp images
    #[command(visible_alias = "i")]
    Images {
        /// Also try palette reduction on PNGs
        #[arg(short, long)]
        palette: bool,
    },

    /// Quantize truecolor PNGs to an indexed palette
    #[command(visible_alias = "p")]
    Palette,

    /// Rebuild and compress PDF documents
    Pdf {
        /// PDF files (default: `[pdf] paths` from config)
        #[arg(value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
        paths: Vec<PathBuf>,
    },

    /// Images with palette pass, then PDFs
    #[command(visible_alias = "a")]
    All,
}

impl Cli {
    /// The command to run, `all` when none was given.
    pub fn resolved_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::All)
    }
}
