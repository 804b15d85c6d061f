use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use console::Style;
use emalign_core::affine::{AffineSolver, Correspondence, Point2};

use super::load_config;

#[derive(Args)]
pub struct FitArgs {
    /// Correspondence file, one `sx sy dx dy` line per point (`#` starts a comment)
    pub points: PathBuf,

    /// Config file (TOML) supplying solver settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// RMS error above which the worst point is rejected
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Never reject below this many points
    #[arg(long)]
    pub min_keep: Option<usize>,

    /// Fit rotation and translation only (exactly two points)
    #[arg(long)]
    pub rotation_only: bool,
}

pub fn run(args: &FitArgs) -> Result<()> {
    let points = read_correspondences(&args.points)?;
    let mut config = load_config(args.config.as_deref())?.solver;
    if let Some(t) = args.threshold {
        config.error_threshold = t;
    }
    if let Some(k) = args.min_keep {
        config.min_points_to_keep = k;
    }

    if args.rotation_only {
        let [p, q] = points.as_slice() else {
            bail!("--rotation-only needs exactly two points, got {}", points.len());
        };
        let map = AffineSolver::fit_rotation(p, q)?;
        println!("forward  {map}");
        println!("rotation {:.4} deg", map.rotation_degrees());
        return Ok(());
    }

    let fit = AffineSolver::new(config).estimate(&points)?;
    let label = Style::new().dim();
    println!("{} {}", label.apply_to("forward "), fit.forward);
    println!("{} {}", label.apply_to("inverse "), fit.inverse);
    println!("{} {:.4} ({} points)", label.apply_to("rms     "), fit.rms, fit.used);
    if !fit.rejected.is_empty() {
        let rejected: Vec<String> = fit.rejected.iter().map(|i| i.to_string()).collect();
        println!("{} {}", label.apply_to("rejected"), rejected.join(" "));
    }
    if !fit.within_threshold {
        println!(
            "{}",
            Style::new()
                .yellow()
                .apply_to("rms still above threshold at the minimum point count")
        );
    }
    Ok(())
}

fn read_correspondences(path: &Path) -> Result<Vec<Correspondence>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut points = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("{}:{}: invalid number", path.display(), n + 1))?;
        let [sx, sy, dx, dy] = values.as_slice() else {
            bail!("{}:{}: expected 4 numbers", path.display(), n + 1);
        };
        points.push(Correspondence::new(Point2::new(*sx, *sy), Point2::new(*dx, *dy)));
    }
    Ok(points)
}
