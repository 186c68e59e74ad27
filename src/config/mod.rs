//! Run configuration from `shrink.toml` and CLI overrides.
//!
//! # Sections
//!
//! | Section     | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | `root`      | Asset directory scanned by the image jobs            |
//! | `[images]`  | Max width, JPEG quality, oxipng level, palette pass  |
//! | `[palette]` | Palette size and NeuQuant sampling                   |
//! | `[pdf]`     | PDF files to rewrite, extra stream compression       |
//!
//! # Example
//!
//! ```toml
//! root = "assets"
//!
//! [images]
//! max_width = 1920
//! quality = 80
//! png_level = 2
//! palette_pass = false
//!
//! [palette]
//! colors = 256
//! sample_factor = 10
//!
//! [pdf]
//! paths = ["assets/brochure.pdf"]
//! compress_all_streams = true
//! ```
//!
//! Relative paths in the file resolve against the file's directory; the
//! file itself is optional.

mod error;

pub use error::ConfigError;

use crate::cli::{Cli, Commands};
use crate::log;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "shrink.toml";

// ============================================================================
// root configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShrinkConfig {
    /// Absolute path to the config file, if one was loaded (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Build and measure candidates without replacing (CLI only)
    #[serde(skip)]
    pub dry_run: bool,

    /// Asset directory, scanned recursively.
    pub root: PathBuf,

    pub images: ImagesConfig,

    pub palette: PaletteConfig,

    pub pdf: PdfConfig,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            dry_run: false,
            root: PathBuf::from("assets"),
            images: ImagesConfig::default(),
            palette: PaletteConfig::default(),
            pdf: PdfConfig::default(),
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Images wider than this are downscaled proportionally.
    pub max_width: u32,

    /// JPEG quality, 1-100. Ignored for PNG and (lossless) WebP.
    pub quality: u8,

    /// oxipng preset for the lossless PNG pass, 0 (fast) to 6 (thorough).
    pub png_level: u8,

    /// Run palette reduction after optimization in the `images` job.
    pub palette_pass: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            quality: 80,
            png_level: 2,
            palette_pass: false,
        }
    }
}

/// `[palette]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Maximum palette entries, 2-256.
    pub colors: usize,

    /// NeuQuant sampling factor, 1 (every pixel) to 30 (fastest).
    pub sample_factor: i32,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: 256,
            sample_factor: 10,
        }
    }
}

/// `[pdf]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// PDF documents to rewrite.
    pub paths: Vec<PathBuf>,

    /// Also compress streams that are not page contents.
    pub compress_all_streams: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("assets/brochure.pdf")],
            compress_all_streams: true,
        }
    }
}

impl ShrinkConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Uses `--config` if given (must exist), otherwise the nearest
    /// `shrink.toml` above the current directory, otherwise defaults.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let config_path = match &cli.config {
            Some(path) => {
                let path = cwd.join(path);
                if !path.is_file() {
                    return Err(ConfigError::Io(
                        path,
                        std::io::Error::from(std::io::ErrorKind::NotFound),
                    )
                    .into());
                }
                Some(path)
            }
            None => find_config_file(&cwd, Path::new(DEFAULT_CONFIG_NAME)),
        };

        let mut config = match &config_path {
            Some(path) => {
                let mut config = Self::from_path(path)?;
                let base = path.parent().unwrap_or(&cwd).to_path_buf();
                config.resolve_paths(&base);
                config.config_path = Some(path.clone());
                config
            }
            None => {
                let mut config = Self::default();
                config.resolve_paths(&cwd);
                config
            }
        };

        config.apply_cli(cli, &cwd);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "ignoring unknown fields in {}: {}", display_path, fields.join(", "));
    }

    /// Make relative paths absolute against `base`.
    fn resolve_paths(&mut self, base: &Path) {
        self.root = base.join(&self.root);
        for path in &mut self.pdf.paths {
            *path = base.join(&*path);
        }
    }

    /// Apply CLI overrides. CLI paths are relative to the working directory.
    fn apply_cli(&mut self, cli: &Cli, cwd: &Path) {
        if let Some(root) = &cli.root {
            self.root = cwd.join(root);
        }
        if let Some(max_width) = cli.max_width {
            self.images.max_width = max_width;
        }
        if let Some(quality) = cli.quality {
            self.images.quality = quality;
        }
        if let Some(colors) = cli.colors {
            self.palette.colors = colors;
        }
        match cli.resolved_command() {
            Commands::Images { palette: true } => self.images.palette_pass = true,
            Commands::Pdf { paths } if !paths.is_empty() => {
                self.pdf.paths = paths.iter().map(|p| cwd.join(p)).collect();
            }
            _ => {}
        }
        self.dry_run = cli.dry_run;
    }

    /// Check value ranges, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.images.max_width == 0 {
            problems.push("images.max_width must be at least 1".to_string());
        }
        if !(1..=100).contains(&self.images.quality) {
            problems.push(format!(
                "images.quality must be within 1..=100, got {}",
                self.images.quality
            ));
        }
        if self.images.png_level > 6 {
            problems.push(format!(
                "images.png_level must be within 0..=6, got {}",
                self.images.png_level
            ));
        }
        if !(2..=256).contains(&self.palette.colors) {
            problems.push(format!(
                "palette.colors must be within 2..=256, got {}",
                self.palette.colors
            ));
        }
        if !(1..=30).contains(&self.palette.sample_factor) {
            problems.push(format!(
                "palette.sample_factor must be within 1..=30, got {}",
                self.palette.sample_factor
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}

/// Find config file by searching upward from `start`.
fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}
