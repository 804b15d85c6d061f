#[allow(dead_code)]
mod common;

use ndarray::Array2;

use emalign_core::affine::{AffineShape, Point2};
use emalign_core::align::{
    extract_shaped, extract_window, CorrelationParams, CorrelationSurface, PatchStats,
    PeakLocator, SpectralCorrelator,
};
use emalign_core::error::AlignError;

fn argmin(surface: &CorrelationSurface) -> (usize, usize) {
    let mut best = (0, 0);
    let mut min = f64::INFINITY;
    for ((row, col), &v) in surface.values.indexed_iter() {
        if v < min {
            min = v;
            best = (col, row);
        }
    }
    best
}

#[test]
fn test_self_correlation_peaks_at_centre() {
    let img = common::blob_image(64, 64, 7);
    let patch = extract_window(&img, Point2::new(32.0, 32.0), 32, 32);
    let params = CorrelationParams {
        apodize: false,
        whiten_exponent: 0.0,
    };
    let surface = SpectralCorrelator::new()
        .correlate(&patch, &patch, &params)
        .unwrap();
    assert_eq!(surface.center(), (16, 16));
    assert_eq!(argmin(&surface), (16, 16));
}

#[test]
fn test_self_correlation_whitened_and_apodized() {
    let img = common::blob_image(80, 60, 3);
    let patch = extract_window(&img, Point2::new(40.0, 30.0), 48, 40);
    let surface = SpectralCorrelator::new()
        .correlate(&patch, &patch, &CorrelationParams::default())
        .unwrap();
    assert_eq!((surface.width(), surface.height()), (48, 40));
    assert_eq!(argmin(&surface), (24, 20));
}

#[test]
fn test_translated_copy_moves_peak() {
    let target = common::blob_image(96, 96, 11);
    let pattern = common::shifted_blob_image(96, 96, 3.0, -2.0, 11);
    let c = Point2::new(48.0, 48.0);
    let t = extract_window(&target, c, 64, 64);
    let p = extract_window(&pattern, c, 64, 64);

    let surface = SpectralCorrelator::new()
        .correlate(&t, &p, &CorrelationParams::default())
        .unwrap();
    assert_eq!(argmin(&surface), (35, 30));

    let peak = PeakLocator::default().locate(&surface);
    assert!((peak.dx - 3.0).abs() < 0.5, "dx = {}", peak.dx);
    assert!((peak.dy + 2.0).abs() < 0.5, "dy = {}", peak.dy);
    assert!(peak.confidence > 5.0, "z = {}", peak.confidence);
}

#[test]
fn test_size_mismatch() {
    let a = Array2::<f64>::zeros((16, 16));
    let b = Array2::<f64>::zeros((16, 32));
    let result = SpectralCorrelator::new().correlate(&a, &b, &CorrelationParams::default());
    assert!(matches!(result, Err(AlignError::SizeMismatch(16, 16, 32, 16))));
}

#[test]
fn test_plan_cache_keyed_by_size() {
    let mut correlator = SpectralCorrelator::new();
    let params = CorrelationParams::default();
    let a = Array2::from_shape_fn((16, 16), |(r, c)| ((r * 3 + c * 5) % 7) as f64);
    let b = Array2::from_shape_fn((24, 16), |(r, c)| ((r * 3 + c * 5) % 7) as f64);
    correlator.correlate(&a, &a, &params).unwrap();
    correlator.correlate(&a, &a, &params).unwrap();
    assert_eq!(correlator.cached_sizes(), 1);
    correlator.correlate(&b, &b, &params).unwrap();
    assert_eq!(correlator.cached_sizes(), 2);
}

#[test]
fn test_spectrum_carries_patch_statistics() {
    let patch = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let spectrum = SpectralCorrelator::new().transform(&patch, true);
    assert!((spectrum.stats.mean - 2.5).abs() < 1e-12);
    assert!((spectrum.stats.variance - 5.0 / 3.0).abs() < 1e-12);
    assert!(spectrum.apodized);
}

#[test]
fn test_flat_patch_statistics() {
    let stats = PatchStats::of(&Array2::from_elem((8, 8), 42.0));
    assert!(stats.is_flat());
    assert_eq!(stats.mean, 42.0);
}

#[test]
fn test_window_outside_image_uses_mean() {
    let img = common::ramp_image(20, 20);
    let patch = extract_window(&img, Point2::new(0.0, 0.0), 8, 8);
    let inside: Vec<f64> = (0..4)
        .flat_map(|y| (0..4).map(move |x| (x, y)))
        .map(|(x, y)| img.luma(x, y))
        .collect();
    let mean = inside.iter().sum::<f64>() / inside.len() as f64;
    assert!((patch[[0, 0]] - mean).abs() < 1e-9);
    assert_eq!(patch[[4, 4]], img.luma(0, 0));
    assert_eq!(patch[[7, 5]], img.luma(1, 3));
}

#[test]
fn test_identity_shape_matches_window_at_whole_pixels() {
    let img = common::ramp_image(40, 30);
    let c = Point2::new(20.0, 15.0);
    let window = extract_window(&img, c, 16, 12);
    let shaped = extract_shaped(&img, c, &AffineShape::identity(), 16, 12);
    for (a, b) in window.iter().zip(shaped.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}
