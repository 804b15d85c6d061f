use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use emalign_core::affine::AffineMap;
use emalign_core::io::{load_image, save_image};
use emalign_core::pixel::PixelBuffer;
use emalign_core::warp::{Interpolation, Mesh, WarpOptions, WarpRasterizer};
use tracing::info;

use super::parse_affine;

#[derive(Clone, ValueEnum)]
pub enum InterpolationArg {
    Nearest,
    Bilinear,
    Bicubic,
}

impl From<&InterpolationArg> for Interpolation {
    fn from(arg: &InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Nearest => Interpolation::Nearest,
            InterpolationArg::Bilinear => Interpolation::Bilinear,
            InterpolationArg::Bicubic => Interpolation::Bicubic,
        }
    }
}

#[derive(Args)]
pub struct WarpArgs {
    /// Source image
    pub source: PathBuf,

    /// Output file path
    #[arg(short, long, default_value = "warped.png")]
    pub output: PathBuf,

    /// Canvas→source map a,b,c,d,e,f (default: identity)
    #[arg(long, value_parser = parse_affine, allow_hyphen_values = true, conflicts_with = "mesh")]
    pub affine: Option<AffineMap>,

    /// Mesh file (TOML with `vertices`, `triangles` and `quads`)
    #[arg(long)]
    pub mesh: Option<PathBuf>,

    /// Paint onto an existing image instead of a blank canvas
    #[arg(long, conflicts_with_all = ["width", "height"])]
    pub canvas: Option<PathBuf>,

    /// Canvas width (default: source width)
    #[arg(long)]
    pub width: Option<usize>,

    /// Canvas height (default: source height)
    #[arg(long)]
    pub height: Option<usize>,

    /// Interpolation
    #[arg(long, value_enum, default_value = "bilinear")]
    pub interp: InterpolationArg,

    /// Source value that is never copied
    #[arg(long)]
    pub skip: Option<u32>,

    /// Initial value of blank canvas pixels
    #[arg(long, default_value = "0")]
    pub fill: u32,
}

pub fn run(args: &WarpArgs) -> Result<()> {
    let source = load_image(&args.source)
        .with_context(|| format!("Failed to read {}", args.source.display()))?;

    let mut canvas = match &args.canvas {
        Some(path) => {
            load_image(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut blank = PixelBuffer::new(
                args.width.unwrap_or(source.width()),
                args.height.unwrap_or(source.height()),
                source.format(),
            )?;
            blank.fill(args.fill);
            blank
        }
    };

    let rasterizer = WarpRasterizer::new(WarpOptions {
        interpolation: (&args.interp).into(),
        skip: args.skip,
    });

    let report = if let Some(path) = &args.mesh {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mesh: Mesh = toml::from_str(&text).context("Invalid mesh file")?;
        info!(
            vertices = mesh.vertices.len(),
            triangles = mesh.triangles.len(),
            quads = mesh.quads.len(),
            "mesh loaded"
        );
        rasterizer.warp(&source, &mut canvas, &mesh)?
    } else {
        let map = args.affine.unwrap_or_default();
        rasterizer.warp_affine(&source, &mut canvas, &map)?
    };

    save_image(&canvas, &args.output)?;
    println!(
        "{} pixels written ({} triangles, {} quads) to {}",
        report.pixels_written,
        report.triangles_drawn,
        report.quads_drawn,
        args.output.display()
    );
    if !report.degenerate_triangles.is_empty() {
        println!(
            "skipped {} degenerate triangle(s)",
            report.degenerate_triangles.len()
        );
    }
    Ok(())
}
