use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::Style;
use emalign_core::affine::AffineMap;
use emalign_core::io::{load_image, save_image};
use emalign_core::pipeline::{align_images_reported, PassReport, ProgressReporter};
use emalign_core::pixel::PixelBuffer;
use emalign_core::warp::WarpRasterizer;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::{load_config, parse_affine};

#[derive(Args)]
pub struct AlignArgs {
    /// Target (fixed) image
    pub target: PathBuf,

    /// Pattern (moving) image
    pub pattern: PathBuf,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Starting target→pattern map a,b,c,d,e,f (default: identity)
    #[arg(long, value_parser = parse_affine, allow_hyphen_values = true)]
    pub initial: Option<AffineMap>,

    /// Render the pattern into the target's frame and save it here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, grid: usize, _windows: usize, passes: usize) {
        self.bar.set_length(passes as u64);
        self.bar.set_position(0);
        self.bar.set_message(format!("{grid}x{grid} windows"));
    }

    fn pass_finished(&self, report: &PassReport) {
        self.bar.inc(1);
        self.bar.println(format!(
            "  {0}x{0} pass {1}: {2} points, rms {3:.3}, z {4:.2}",
            report.grid,
            report.pass + 1,
            report.points,
            report.rms,
            report.mean_confidence
        ));
    }

    fn finish(&self) {
        self.bar.finish_with_message("Done");
    }
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let target = load_image(&args.target)
        .with_context(|| format!("Failed to read {}", args.target.display()))?;
    let pattern = load_image(&args.pattern)
        .with_context(|| format!("Failed to read {}", args.pattern.display()))?;
    info!(
        target = %format!("{}x{} {}", target.width(), target.height(), target.format()),
        pattern = %format!("{}x{} {}", pattern.width(), pattern.height(), pattern.format()),
        "images loaded"
    );
    let (target_gray, pattern_gray) = (target.to_gray8(), pattern.to_gray8());

    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let reporter = BarReporter { bar: pb };

    let initial = args.initial.unwrap_or_default();
    let result = align_images_reported(&target_gray, &pattern_gray, &config, &initial, &reporter)?;

    let label = Style::new().dim();
    println!("{} {}", label.apply_to("map     "), result.map);
    println!("{} {:.3} deg", label.apply_to("rotation"), result.map.rotation_degrees());
    if let Some(rms) = result.final_rms() {
        println!("{} {:.4}", label.apply_to("rms     "), rms);
    }

    if let Some(ref out) = args.output {
        let mut canvas = PixelBuffer::new(target.width(), target.height(), pattern.format())?;
        WarpRasterizer::new(config.warp.clone()).warp_affine(&pattern, &mut canvas, &result.map)?;
        save_image(&canvas, out)?;
        println!("\nAligned pattern saved to {}", out.display());
    }
    Ok(())
}
