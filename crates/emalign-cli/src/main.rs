mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emalign", about = "Tile registration and warping for image montages")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register one window of a pattern image against a target image
    Register(commands::register::RegisterArgs),
    /// Fit an affine map to point correspondences
    Fit(commands::fit::FitArgs),
    /// Render an image through an affine map or a mesh
    Warp(commands::warp::WarpArgs),
    /// Estimate the affine map between two images with the multi-stage recipe
    Align(commands::align::AlignArgs),
    /// Print the default configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Register(args) => commands::register::run(args),
        Commands::Fit(args) => commands::fit::run(args),
        Commands::Warp(args) => commands::warp::run(args),
        Commands::Align(args) => commands::align::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
