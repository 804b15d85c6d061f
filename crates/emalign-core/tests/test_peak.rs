#[allow(dead_code)]
mod common;

use ndarray::Array2;

use emalign_core::align::{CorrelationSurface, PeakConfig, PeakLocator};

fn noise_surface(w: usize, h: usize, amplitude: f64, seed: u64) -> Array2<f64> {
    let mut rng = common::Lcg::new(seed);
    Array2::from_shape_fn((h, w), |_| rng.range(-amplitude, amplitude))
}

#[test]
fn test_isolated_minimum() {
    let mut values = noise_surface(64, 64, 0.01, 1);
    values[[20, 40]] = -10.0;
    let peak = PeakLocator::default().locate(&CorrelationSurface { values });

    assert!((peak.dx - 8.0).abs() < 0.5, "dx = {}", peak.dx);
    assert!((peak.dy + 12.0).abs() < 0.5, "dy = {}", peak.dy);
    assert_eq!(peak.cell, (40, 20));
    assert!(peak.confidence > 30.0);
    assert!(peak.is_reliable_default(), "uncertainty {}", peak.uncertainty);
}

#[test]
fn test_subpixel_between_two_cells() {
    let mut values = Array2::<f64>::zeros((32, 32));
    values[[16, 20]] = -8.0;
    values[[16, 21]] = -8.0;
    let peak = PeakLocator::default().locate(&CorrelationSurface { values });
    assert!((peak.dx - 4.5).abs() < 1e-9, "dx = {}", peak.dx);
    assert!(peak.dy.abs() < 1e-9);
}

#[test]
fn test_noise_surface_is_unreliable() {
    let values = noise_surface(64, 64, 1.0, 99);
    let peak = PeakLocator::default().locate(&CorrelationSurface { values });
    assert!(peak.has_signal());
    assert!(!peak.is_reliable_default(), "uncertainty {}", peak.uncertainty);
}

#[test]
fn test_flat_surface_has_no_signal() {
    let values = Array2::from_elem((16, 16), 3.0);
    let peak = PeakLocator::default().locate(&CorrelationSurface { values });
    assert!(!peak.has_signal());
    assert_eq!((peak.dx, peak.dy), (0.0, 0.0));
    assert!(!peak.is_reliable(f64::MAX));
}

#[test]
fn test_min_mass_rejects_weak_marginals() {
    let mut values = Array2::<f64>::zeros((16, 16));
    values[[4, 4]] = -1.0;
    let config = PeakConfig {
        min_mass: 1e6,
        ..Default::default()
    };
    let peak = PeakLocator::new(config).locate(&CorrelationSurface { values });
    assert!(!peak.has_signal());
    assert_eq!(peak.cell, (4, 4));
}
