pub mod align;
pub mod config;
pub mod fit;
pub mod register;
pub mod warp;

use std::path::Path;

use anyhow::{bail, Context, Result};
use emalign_core::affine::{AffineMap, Point2};
use emalign_core::pipeline::config::AlignConfig;

/// Read a TOML config, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<AlignConfig> {
    match path {
        Some(path) => AlignConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AlignConfig::default()),
    }
}

fn parse_numbers(s: &str, expected: usize) -> Result<Vec<f64>> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid number list '{s}'"))?;
    if values.len() != expected {
        bail!("Expected {expected} comma-separated numbers, got {}", values.len());
    }
    Ok(values)
}

/// Parse `x,y`.
pub fn parse_point(s: &str) -> std::result::Result<Point2, String> {
    parse_numbers(s, 2)
        .map(|v| Point2::new(v[0], v[1]))
        .map_err(|e| e.to_string())
}

/// Parse `a,b,c,d,e,f`.
pub fn parse_affine(s: &str) -> std::result::Result<AffineMap, String> {
    parse_numbers(s, 6)
        .map(|v| AffineMap::from_coefficients([v[0], v[1], v[2], v[3], v[4], v[5]]))
        .map_err(|e| e.to_string())
}
