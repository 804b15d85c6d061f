use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::Style;
use emalign_core::affine::{AffineMap, AffineShape, Point2};
use emalign_core::io::load_image;
use emalign_core::register::{Registrar, RegistrationOutcome, RegistrationRequest};

use super::{load_config, parse_affine, parse_point};

#[derive(Args)]
pub struct RegisterArgs {
    /// Target image
    pub target: PathBuf,

    /// Pattern image
    pub pattern: PathBuf,

    /// Config file (TOML); command-line options override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Square window size in pixels
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Target window centre as x,y (default: image centre)
    #[arg(long, value_parser = parse_point)]
    pub target_center: Option<Point2>,

    /// Starting pattern window centre as x,y (default: image centre)
    #[arg(long, value_parser = parse_point)]
    pub pattern_center: Option<Point2>,

    /// Correlate/move iterations
    #[arg(short, long)]
    pub iterations: Option<usize>,

    /// Whitening exponent (-1 = phase correlation, 0 = plain correlation)
    #[arg(long, allow_hyphen_values = true)]
    pub whiten: Option<f64>,

    /// Disable the Tukey window
    #[arg(long)]
    pub no_apodize: bool,

    /// Rotate the pattern window by this many degrees
    #[arg(long, allow_hyphen_values = true)]
    pub rotation: Option<f64>,

    /// Predict the pattern centre and shape from a target→pattern map a,b,c,d,e,f
    #[arg(long, value_parser = parse_affine, allow_hyphen_values = true, conflicts_with_all = ["pattern_center", "rotation"])]
    pub affine: Option<AffineMap>,

    /// Reset when the z-score ends below this
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Reset when the x movement exceeds this many pixels
    #[arg(long)]
    pub max_dx: Option<f64>,

    /// Reset when the y movement exceeds this many pixels
    #[arg(long)]
    pub max_dy: Option<f64>,

    /// Do not move along x
    #[arg(long)]
    pub freeze_x: bool,

    /// Do not move along y
    #[arg(long)]
    pub freeze_y: bool,

    /// Reverse the target's contrast before correlating
    #[arg(long)]
    pub reverse: bool,
}

pub fn run(args: &RegisterArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?.registration;
    if let Some(size) = args.window {
        config.window_width = size;
        config.window_height = size;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(w) = args.whiten {
        config.whiten_exponent = w;
    }
    config.apodize &= !args.no_apodize;
    config.freeze_x |= args.freeze_x;
    config.freeze_y |= args.freeze_y;
    config.reset.min_confidence = args.min_confidence.or(config.reset.min_confidence);
    config.reset.max_dx = args.max_dx.or(config.reset.max_dx);
    config.reset.max_dy = args.max_dy.or(config.reset.max_dy);

    let mut target = load_image(&args.target)
        .with_context(|| format!("Failed to read {}", args.target.display()))?
        .to_gray8();
    let pattern = load_image(&args.pattern)
        .with_context(|| format!("Failed to read {}", args.pattern.display()))?
        .to_gray8();
    if args.reverse {
        target.invert();
    }

    let request = match (&args.affine, args.target_center) {
        (Some(map), Some(tc)) => RegistrationRequest::predicted(tc, map),
        (Some(map), None) => RegistrationRequest::predicted(
            emalign_core::register::image_center(&target),
            map,
        ),
        (None, _) => RegistrationRequest {
            target_center: args.target_center,
            pattern_center: args.pattern_center,
            shape: args.rotation.map(AffineShape::rotation).unwrap_or_default(),
        },
    };

    let mut registrar = Registrar::new(&target, &pattern, config)?;
    let outcome = registrar.register(&request)?;
    print_outcome(args, &outcome);
    Ok(())
}

fn print_outcome(args: &RegisterArgs, o: &RegistrationOutcome) {
    let warn = Style::new().yellow().bold();
    let dim = Style::new().dim();

    let mut line = format!(
        "{:.2}: {} {:.3} {:.3} {} {:.3} {:.3}  ({:.3}, {:.3})  rot {:.3}  unc {:.3}",
        o.confidence,
        args.target.display(),
        o.target_center.x,
        o.target_center.y,
        args.pattern.display(),
        o.pattern_center.x,
        o.pattern_center.y,
        o.dx,
        o.dy,
        o.rotation_degrees,
        o.uncertainty,
    );
    if o.far_x {
        line.push_str(&format!(" {}", warn.apply_to("dx>w/4")));
    }
    if o.far_y {
        line.push_str(&format!(" {}", warn.apply_to("dy>h/4")));
    }
    println!("{line}");

    if let Some(reset) = &o.reset {
        let mut reasons = Vec::new();
        if reset.low_confidence {
            reasons.push("low confidence");
        }
        if reset.x_exceeded {
            reasons.push("x limit");
        }
        if reset.y_exceeded {
            reasons.push("y limit");
        }
        println!(
            "{} {} {}",
            warn.apply_to("reset:"),
            reasons.join(", "),
            dim.apply_to(format!(
                "(rejected {:.3} {:.3})",
                reset.rejected_center.x, reset.rejected_center.y
            ))
        );
    }
}
