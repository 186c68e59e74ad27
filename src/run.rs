//! Jobs: drive the size gate over images and PDFs.
//!
//! Each job processes one asset completely before the next and returns a
//! [`RunSummary`]. Per-asset failures are logged and recorded, never fatal.

use std::path::Path;

use crate::asset::{AssetFormat, scan_assets};
use crate::config::ShrinkConfig;
use crate::core::is_shutdown;
use crate::image::{LosslessPng, OptimizeImage, PaletteReduce};
use crate::pdf::RebuildPdf;
use crate::replace::{Gate, Transform};
use crate::report::{AssetOutcome, RunSummary};
use crate::utils::fmt::{format_mb, percent_saved};
use crate::{debug, log};

/// Resize and re-encode every raster image under the root.
///
/// PNGs also get a lossless oxipng pass, then palette reduction when
/// `images.palette_pass` is set.
pub fn optimize_images(config: &ShrinkConfig) -> RunSummary {
    let optimize = || -> Box<dyn Transform> {
        Box::new(OptimizeImage {
            max_width: config.images.max_width,
            quality: config.images.quality,
        })
    };
    let raster = vec![optimize()];
    let mut png = vec![
        optimize(),
        Box::new(LosslessPng {
            level: config.images.png_level,
        }) as Box<dyn Transform>,
    ];
    if config.images.palette_pass {
        png.push(palette_step(config));
    }

    log!("images"; "optimizing images in {}", config.root.display());
    run_over_root(config, &AssetFormat::RASTER, |format| {
        if format == AssetFormat::Png { png.as_slice() } else { raster.as_slice() }
    })
}

/// Quantize every truecolor PNG under the root to a palette.
pub fn fix_palettes(config: &ShrinkConfig) -> RunSummary {
    let chain = vec![palette_step(config)];

    log!("palette"; "reducing png palettes in {}", config.root.display());
    run_over_root(config, &[AssetFormat::Png], |_| chain.as_slice())
}

/// Rebuild and compress each configured PDF.
pub fn compress_pdfs(config: &ShrinkConfig) -> RunSummary {
    let gate = Gate::new(config.dry_run);
    let chain: Vec<Box<dyn Transform>> = vec![Box::new(RebuildPdf {
        compress_all_streams: config.pdf.compress_all_streams,
    })];

    let mut summary = RunSummary::new();
    for path in &config.pdf.paths {
        if is_shutdown() {
            break;
        }
        log!("pdf"; "compressing {}", path.display());
        let outcome = gate.run_chain(path, &chain);
        report(&path.display().to_string(), &outcome, config.dry_run, true);
        summary.record(path, outcome);
    }
    summary
}

/// Images with palette pass, then PDFs.
pub fn run_all(config: &ShrinkConfig) -> RunSummary {
    let mut images_config = config.clone();
    images_config.images.palette_pass = true;

    let mut summary = optimize_images(&images_config);
    if !is_shutdown() {
        summary.merge(compress_pdfs(config));
    }
    summary
}

fn palette_step(config: &ShrinkConfig) -> Box<dyn Transform> {
    Box::new(PaletteReduce {
        colors: config.palette.colors,
        sample_factor: config.palette.sample_factor,
    })
}

/// Scan the root for `formats` and run the chain picked per asset format.
fn run_over_root<'a>(
    config: &ShrinkConfig,
    formats: &[AssetFormat],
    chain_for: impl Fn(AssetFormat) -> &'a [Box<dyn Transform>],
) -> RunSummary {
    let mut summary = RunSummary::new();
    let root = &config.root;
    if !root.is_dir() {
        log!("error"; "asset directory not found: {}", root.display());
        return summary;
    }

    let gate = Gate::new(config.dry_run);
    let assets = scan_assets(root, formats);
    debug!("scan"; "{} candidates under {}", assets.len(), root.display());

    for asset in assets {
        if is_shutdown() {
            break;
        }
        debug!(asset.format.name(); "processing {}", asset.path.display());
        let outcome = gate.run_chain(&asset.path, chain_for(asset.format));
        report(&display_path(root, &asset.path), &outcome, config.dry_run, false);
        summary.record(asset.path, outcome);
    }
    summary
}

/// Log one outcome. Kept images are only shown in verbose mode.
fn report(name: &str, outcome: &AssetOutcome, dry_run: bool, loud_kept: bool) {
    match outcome {
        AssetOutcome::Replaced { before, after } => {
            let module = if dry_run { "would shrink" } else { "shrunk" };
            log!(
                module;
                "{}: {} -> {} (-{:.1}%)",
                name,
                format_mb(*before),
                format_mb(*after),
                percent_saved(*before, *after)
            );
        }
        AssetOutcome::Kept { size } if loud_kept => {
            log!("kept"; "{}: no smaller rewrite ({})", name, format_mb(*size));
        }
        AssetOutcome::Kept { size } => {
            debug!("kept"; "{}: no smaller rewrite ({})", name, format_mb(*size));
        }
        AssetOutcome::Skipped { reason } if reason == "not found" => {
            log!("error"; "{}: not found", name);
        }
        AssetOutcome::Skipped { reason } => debug!("skip"; "{}: {}", name, reason),
        AssetOutcome::Failed { error } => log!("error"; "{}: {}", name, error),
    }
}

/// Path relative to `root` for display, or the full path outside it.
fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
