use tracing::{info, warn};

use crate::affine::{AffineMap, AffineSolver, Correspondence, Point2};
use crate::error::{AlignError, Result};
use crate::pixel::PixelBuffer;
use crate::register::{register_batch, RegistrationConfig, RegistrationRequest};

use super::config::{AlignConfig, RecipeStage};
use super::types::{AlignmentResult, NoOpReporter, PassReport, ProgressReporter};

/// Estimate the affine map taking `target` coordinates onto `pattern`
/// coordinates, refining `initial` stage by stage.
pub fn align_images(
    target: &PixelBuffer,
    pattern: &PixelBuffer,
    config: &AlignConfig,
    initial: &AffineMap,
) -> Result<AlignmentResult> {
    align_images_reported(target, pattern, config, initial, &NoOpReporter)
}

/// [`align_images`] with progress callbacks.
pub fn align_images_reported(
    target: &PixelBuffer,
    pattern: &PixelBuffer,
    config: &AlignConfig,
    initial: &AffineMap,
    reporter: &dyn ProgressReporter,
) -> Result<AlignmentResult> {
    config.validate()?;
    let solver = AffineSolver::new(config.solver.clone());
    let mut map = *initial;
    let mut passes = Vec::new();

    for stage in &config.recipe.stages {
        let (registration, centers) = stage_windows(target, stage, &config.registration)?;
        reporter.begin_stage(stage.grid, centers.len(), stage.passes);
        info!(
            grid = stage.grid,
            window = registration.window_width,
            passes = stage.passes,
            "starting alignment stage"
        );

        for pass in 0..stage.passes {
            let requests: Vec<RegistrationRequest> = centers
                .iter()
                .map(|&c| RegistrationRequest::predicted(c, &map))
                .collect();
            let outcomes = register_batch(target, pattern, &registration, &requests)?;

            let mut points = Vec::new();
            let mut windows = Vec::new();
            let mut confidence_sum = 0.0;
            let mut discarded = 0;
            for (index, outcome) in outcomes.into_iter().enumerate() {
                match outcome {
                    Ok(o) if !o.is_reset() && usable(o.uncertainty, config.recipe.max_uncertainty) => {
                        confidence_sum += o.confidence;
                        points.push(o.correspondence());
                        windows.push(index);
                    }
                    Ok(_) => discarded += 1,
                    Err(e) => {
                        warn!(window = index, "registration failed: {e}");
                        discarded += 1;
                    }
                }
            }

            let report = match points.as_slice() {
                [] => {
                    return Err(AlignError::DegenerateSystem(format!(
                        "no usable window in {0}x{0} stage, pass {1}",
                        stage.grid,
                        pass + 1
                    )))
                }
                [only] => {
                    map = recentre(&map, only);
                    PassReport {
                        grid: stage.grid,
                        pass,
                        points: 1,
                        discarded,
                        rejected: Vec::new(),
                        rms: 0.0,
                        mean_confidence: confidence_sum,
                        map,
                    }
                }
                _ => {
                    let fit = solver.estimate(&points)?;
                    if !fit.within_threshold {
                        warn!(rms = fit.rms, used = fit.used, "affine fit above error threshold");
                    }
                    map = fit.forward;
                    PassReport {
                        grid: stage.grid,
                        pass,
                        points: fit.used,
                        discarded,
                        rejected: fit.rejected.iter().map(|&i| windows[i]).collect(),
                        rms: fit.rms,
                        mean_confidence: confidence_sum / points.len() as f64,
                        map,
                    }
                }
            };
            info!(
                grid = stage.grid,
                pass = pass + 1,
                points = report.points,
                rms = report.rms,
                "alignment pass finished"
            );
            reporter.pass_finished(&report);
            passes.push(report);
        }
    }

    reporter.finish();
    Ok(AlignmentResult { map, passes })
}

/// Window size and window centres of a stage.
fn stage_windows(
    target: &PixelBuffer,
    stage: &RecipeStage,
    base: &RegistrationConfig,
) -> Result<(RegistrationConfig, Vec<Point2>)> {
    let registration = RegistrationConfig {
        window_width: target.width() / stage.grid,
        window_height: target.height() / stage.grid,
        ..base.clone()
    };
    registration.validate()?;

    let (sw, sh) = (registration.window_width as f64, registration.window_height as f64);
    let mut centers = Vec::with_capacity(stage.grid * stage.grid);
    for j in 0..stage.grid {
        for i in 0..stage.grid {
            centers.push(Point2::new(
                (sw * (i as f64 + 0.5)).floor(),
                (sh * (j as f64 + 0.5)).floor(),
            ));
        }
    }
    Ok((registration, centers))
}

fn usable(uncertainty: f64, max: Option<f64>) -> bool {
    uncertainty.is_finite() && max.map_or(true, |m| uncertainty <= m)
}

/// Keep the map's shape, moving it so `point.source` lands on `point.dest`.
fn recentre(map: &AffineMap, point: &Correspondence) -> AffineMap {
    let predicted = map.apply(point.source);
    map.shifted(point.dest.x - predicted.x, point.dest.y - predicted.y)
}
