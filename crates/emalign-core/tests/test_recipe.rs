#[allow(dead_code)]
mod common;

use std::sync::Mutex;

use emalign_core::affine::{AffineMap, Point2};
use emalign_core::error::AlignError;
use emalign_core::pipeline::config::{AlignConfig, RecipeStage};
use emalign_core::pipeline::{align_images, align_images_reported, PassReport, ProgressReporter};

fn two_stage_config() -> AlignConfig {
    let mut config = AlignConfig::default();
    config.recipe.stages = vec![RecipeStage::new(1, 2), RecipeStage::new(2, 2)];
    config
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<(usize, usize, usize)>>,
    passes: Mutex<Vec<(usize, usize, usize)>>,
    finished: Mutex<bool>,
}

impl ProgressReporter for Recorder {
    fn begin_stage(&self, grid: usize, windows: usize, passes: usize) {
        self.stages.lock().unwrap().push((grid, windows, passes));
    }

    fn pass_finished(&self, report: &PassReport) {
        self.passes
            .lock()
            .unwrap()
            .push((report.grid, report.pass, report.points));
    }

    fn finish(&self) {
        *self.finished.lock().unwrap() = true;
    }
}

#[test]
fn test_recovers_translation() {
    let target = common::blob_image(128, 128, 51);
    let pattern = common::shifted_blob_image(128, 128, 2.0, -1.5, 51);

    let result = align_images(&target, &pattern, &two_stage_config(), &AffineMap::identity()).unwrap();

    let c = Point2::new(64.0, 64.0);
    let p = result.map.apply(c);
    assert!((p.x - 66.0).abs() < 0.3, "x = {}", p.x);
    assert!((p.y - 62.5).abs() < 0.3, "y = {}", p.y);

    let shape = result.map.shape();
    assert!((shape.a - 1.0).abs() < 0.02, "{}", result.map);
    assert!(shape.b.abs() < 0.02, "{}", result.map);
    assert!(shape.d.abs() < 0.02, "{}", result.map);
    assert!((shape.e - 1.0).abs() < 0.02, "{}", result.map);

    assert_eq!(result.passes.len(), 4);
    assert_eq!(result.passes[0].points, 1);
    assert_eq!(result.passes[0].rms, 0.0);
    assert_eq!(result.passes[3].points, 4);
    assert!(result.final_rms().unwrap() < 0.5);
}

#[test]
fn test_single_window_keeps_shape() {
    let target = common::blob_image(96, 96, 52);
    let pattern = common::shifted_blob_image(96, 96, 3.0, 1.0, 52);
    let mut config = AlignConfig::default();
    config.recipe.stages = vec![RecipeStage::new(1, 1)];
    let initial = AffineMap::from_coefficients([1.001, 0.0, 0.0, 0.0, 1.001, 0.0]);

    let result = align_images(&target, &pattern, &config, &initial).unwrap();
    assert_eq!(result.map.shape(), initial.shape());
    assert_eq!(result.passes.len(), 1);
}

#[test]
fn test_recovers_rotation() {
    let c = Point2::new(96.0, 96.0);
    let truth = AffineMap::translation(2.0, 1.0).compose(&AffineMap::rotation_about(3.0, c));
    let target = common::blob_image(192, 192, 56);
    let pattern = common::mapped_blob_image(192, 192, 56, &truth);

    let result = align_images(&target, &pattern, &AlignConfig::default(), &AffineMap::identity()).unwrap();

    assert_eq!(result.passes.len(), 6);
    for p in [Point2::new(60.0, 60.0), Point2::new(130.0, 130.0), c] {
        let got = result.map.apply(p);
        let want = truth.apply(p);
        assert!(got.distance(&want) < 0.3, "at {p:?}: {got:?} vs {want:?}");
    }
    assert!(
        (result.map.rotation_degrees() - 3.0).abs() < 0.1,
        "rotation {}",
        result.map.rotation_degrees()
    );
}

#[test]
fn test_reporter_sees_every_pass() {
    let target = common::blob_image(128, 128, 53);
    let pattern = common::shifted_blob_image(128, 128, 1.0, 1.0, 53);
    let recorder = Recorder::default();

    align_images_reported(
        &target,
        &pattern,
        &two_stage_config(),
        &AffineMap::identity(),
        &recorder,
    )
    .unwrap();

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![(1, 1, 2), (2, 4, 2)]
    );
    let passes = recorder.passes.lock().unwrap();
    assert_eq!(passes.len(), 4);
    assert_eq!(passes[1], (1, 1, 1));
    assert_eq!(passes[2].0, 2);
    assert!(*recorder.finished.lock().unwrap());
}

#[test]
fn test_featureless_images_fail() {
    let flat = common::canvas(64, 64, 100);
    let result = align_images(&flat, &flat, &AlignConfig::default(), &AffineMap::identity());
    assert!(matches!(result, Err(AlignError::DegenerateSystem(_))));
}

#[test]
fn test_empty_recipe_rejected() {
    let img = common::blob_image(64, 64, 54);
    let mut config = AlignConfig::default();
    config.recipe.stages.clear();
    let result = align_images(&img, &img, &config, &AffineMap::identity());
    assert!(matches!(result, Err(AlignError::InvalidConfig(_))));
}

#[test]
fn test_grid_too_fine_for_image() {
    let img = common::blob_image(32, 32, 55);
    let mut config = AlignConfig::default();
    config.recipe.stages = vec![RecipeStage::new(16, 1)];
    let result = align_images(&img, &img, &config, &AffineMap::identity());
    assert!(matches!(result, Err(AlignError::InvalidConfig(_))));
}
