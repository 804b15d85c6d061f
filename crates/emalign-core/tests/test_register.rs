#[allow(dead_code)]
mod common;

use emalign_core::affine::{AffineMap, AffineShape, Point2};
use emalign_core::error::AlignError;
use emalign_core::register::{
    register_batch, Registrar, RegistrationConfig, RegistrationPhase, RegistrationRequest,
    ResetThresholds,
};

fn config(window: usize, iterations: usize) -> RegistrationConfig {
    RegistrationConfig {
        iterations,
        ..RegistrationConfig::with_window(window)
    }
}

#[test]
fn test_converges_on_subpixel_shift() {
    let target = common::blob_image(100, 100, 21);
    let pattern = common::shift_bilinear(&target, 3.4, -2.1);

    let mut registrar = Registrar::new(&target, &pattern, config(64, 3)).unwrap();
    let outcome = registrar.register(&RegistrationRequest::default()).unwrap();

    assert_eq!(outcome.phase, RegistrationPhase::Converged);
    assert_eq!(outcome.iterations, 3);
    assert!((outcome.dx - 3.4).abs() < 0.2, "dx = {}", outcome.dx);
    assert!((outcome.dy + 2.1).abs() < 0.2, "dy = {}", outcome.dy);
    assert!(outcome.confidence > 5.0, "z = {}", outcome.confidence);
    assert!(outcome.best_confidence >= outcome.confidence);
    assert!(!outcome.far_x && !outcome.far_y);
    assert_eq!(outcome.start, Point2::new(50.0, 50.0));
}

#[test]
fn test_correspondence_runs_target_to_pattern() {
    let target = common::blob_image(96, 96, 5);
    let pattern = common::shifted_blob_image(96, 96, -4.0, 2.0, 5);

    let mut registrar = Registrar::new(&target, &pattern, config(48, 2)).unwrap();
    let request = RegistrationRequest::at(Point2::new(48.0, 48.0), Point2::new(48.0, 48.0));
    let outcome = registrar.register(&request).unwrap();

    let c = outcome.correspondence();
    assert_eq!(c.source, Point2::new(48.0, 48.0));
    assert!((c.dest.x - 44.0).abs() < 0.3, "x = {}", c.dest.x);
    assert!((c.dest.y - 50.0).abs() < 0.3, "y = {}", c.dest.y);
}

#[test]
fn test_low_confidence_resets() {
    let target = common::blob_image(80, 80, 8);
    let pattern = common::shifted_blob_image(80, 80, 2.0, 1.0, 8);
    let mut cfg = config(32, 2);
    cfg.reset = ResetThresholds {
        min_confidence: Some(1e9),
        ..Default::default()
    };

    let outcome = Registrar::new(&target, &pattern, cfg)
        .unwrap()
        .register(&RegistrationRequest::default())
        .unwrap();

    assert!(outcome.is_reset());
    assert_eq!(outcome.phase, RegistrationPhase::Reset);
    assert_eq!(outcome.pattern_center, outcome.start);
    assert_eq!((outcome.dx, outcome.dy), (0.0, 0.0));
    let report = outcome.reset.unwrap();
    assert!(report.low_confidence);
    assert!(!report.x_exceeded && !report.y_exceeded);
    assert!((report.rejected_center.x - outcome.start.x - 2.0).abs() < 0.5);
}

#[test]
fn test_movement_limit_resets() {
    let target = common::blob_image(80, 80, 9);
    let pattern = common::shifted_blob_image(80, 80, 3.0, 0.0, 9);
    let mut cfg = config(32, 2);
    cfg.reset.max_dx = Some(1.0);
    cfg.reset.max_dy = Some(1.0);

    let outcome = Registrar::new(&target, &pattern, cfg)
        .unwrap()
        .register(&RegistrationRequest::default())
        .unwrap();

    let report = outcome.reset.unwrap();
    assert!(report.x_exceeded);
    assert!(!report.y_exceeded);
    assert!(!report.low_confidence);
}

#[test]
fn test_freeze_x_keeps_column() {
    let target = common::blob_image(80, 80, 13);
    let pattern = common::shifted_blob_image(80, 80, 3.0, 2.0, 13);
    let mut cfg = config(48, 2);
    cfg.freeze_x = true;

    let outcome = Registrar::new(&target, &pattern, cfg)
        .unwrap()
        .register(&RegistrationRequest::default())
        .unwrap();

    assert_eq!(outcome.dx, 0.0);
    assert!((outcome.dy - 2.0).abs() < 0.5, "dy = {}", outcome.dy);
}

#[test]
fn test_far_flags() {
    let target = common::blob_image(128, 128, 17);
    let pattern = common::shifted_blob_image(128, 128, 17.0, 0.0, 17);

    let outcome = Registrar::new(&target, &pattern, config(64, 2))
        .unwrap()
        .register(&RegistrationRequest::default())
        .unwrap();

    // a quarter of a 64 pixel window is 16 pixels
    assert!(outcome.far_x, "dx = {}", outcome.dx);
    assert!(!outcome.far_y, "dy = {}", outcome.dy);
}

#[test]
fn test_target_spectrum_cache() {
    let target = common::blob_image(96, 96, 2);
    let pattern = common::shifted_blob_image(96, 96, 1.0, 1.0, 2);
    let mut registrar = Registrar::new(&target, &pattern, config(32, 1)).unwrap();
    assert!(registrar.cached_target().is_none());

    let request = RegistrationRequest::at(Point2::new(40.4, 39.6), Point2::new(40.0, 40.0));
    let first = registrar.register(&request).unwrap();
    assert_eq!(first.target_center, Point2::new(40.0, 40.0));
    assert_eq!(
        registrar.cached_target(),
        Some((Point2::new(40.0, 40.0), 32, 32))
    );

    let again = registrar.register(&request).unwrap();
    assert_eq!(first, again);

    registrar.set_config(config(48, 1)).unwrap();
    registrar.register(&request).unwrap();
    assert_eq!(
        registrar.cached_target(),
        Some((Point2::new(40.0, 40.0), 48, 48))
    );

    registrar
        .register(&RegistrationRequest::at(Point2::new(50.0, 44.0), Point2::new(50.0, 44.0)))
        .unwrap();
    assert_eq!(
        registrar.cached_target(),
        Some((Point2::new(50.0, 44.0), 48, 48))
    );
}

#[test]
fn test_invalid_config_rejected() {
    let img = common::canvas(16, 16, 10);
    let cfg = config(64, 0);
    assert!(matches!(
        Registrar::new(&img, &img, cfg),
        Err(AlignError::InvalidConfig(_))
    ));
    let cfg = RegistrationConfig::with_window(2);
    assert!(matches!(
        Registrar::new(&img, &img, cfg),
        Err(AlignError::InvalidConfig(_))
    ));
}

#[test]
fn test_flat_images_do_not_move() {
    let img = common::canvas(64, 64, 90);
    let outcome = Registrar::new(&img, &img, config(32, 2))
        .unwrap()
        .register(&RegistrationRequest::default())
        .unwrap();
    assert_eq!((outcome.dx, outcome.dy), (0.0, 0.0));
    assert!(outcome.uncertainty.is_infinite());
}

#[test]
fn test_batch_matches_sequential() {
    let target = common::blob_image(128, 128, 31);
    let pattern = common::shifted_blob_image(128, 128, 2.0, -1.0, 31);
    let cfg = config(32, 2);
    let requests: Vec<RegistrationRequest> = [32.0, 64.0, 96.0]
        .iter()
        .flat_map(|&y| {
            [32.0, 64.0, 96.0]
                .iter()
                .map(move |&x| RegistrationRequest::at(Point2::new(x, y), Point2::new(x, y)))
        })
        .collect();

    let batch = register_batch(&target, &pattern, &cfg, &requests).unwrap();
    assert_eq!(batch.len(), requests.len());

    let mut registrar = Registrar::new(&target, &pattern, cfg).unwrap();
    for (request, result) in requests.iter().zip(batch) {
        let expected = registrar.register(request).unwrap();
        let got = result.unwrap();
        assert!((got.dx - expected.dx).abs() < 1e-9);
        assert!((got.dy - expected.dy).abs() < 1e-9);
        assert_eq!(got.target_center, expected.target_center);
    }
}

#[test]
fn test_predicted_request_starts_from_map() {
    let target = common::blob_image(96, 96, 41);
    let pattern = common::shifted_blob_image(96, 96, 5.0, 3.0, 41);
    let map = AffineMap::translation(4.0, 3.0);
    let c = Point2::new(48.0, 48.0);

    let request = RegistrationRequest::predicted(c, &map);
    assert_eq!(request.pattern_center, Some(Point2::new(52.0, 51.0)));
    assert!(request.shape.is_identity());

    let outcome = Registrar::new(&target, &pattern, config(32, 2))
        .unwrap()
        .register(&request)
        .unwrap();
    assert_eq!(outcome.start, Point2::new(52.0, 51.0));
    assert!((outcome.dx - 1.0).abs() < 0.3, "dx = {}", outcome.dx);
    assert!(outcome.dy.abs() < 0.3, "dy = {}", outcome.dy);
}

#[test]
fn test_rotated_window_follows_shape() {
    let c = Point2::new(64.0, 64.0);
    let map = AffineMap::translation(3.0, -2.0).compose(&AffineMap::rotation_about(8.0, c));
    let target = common::blob_image(128, 128, 61);
    let pattern = common::mapped_blob_image(128, 128, 61, &map);

    let request = RegistrationRequest::at(c, c).with_shape(AffineShape::rotation(8.0));
    let outcome = Registrar::new(&target, &pattern, config(64, 3))
        .unwrap()
        .register(&request)
        .unwrap();

    let expected = map.apply(c);
    assert!(
        outcome.pattern_center.distance(&expected) < 0.25,
        "landed at {:?}, expected {:?}",
        outcome.pattern_center,
        expected
    );
    assert!((outcome.rotation_degrees - 8.0).abs() < 1e-9);
    assert!(outcome.confidence > 5.0, "z = {}", outcome.confidence);
}
