use serde::{Deserialize, Serialize};

use crate::affine::{AffineMap, AffineShape, Point2};
use crate::align::{CorrelationParams, PeakConfig};
use crate::consts::{DEFAULT_ITERATIONS, DEFAULT_WHITEN_EXPONENT, MAX_ITERATIONS};
use crate::error::{AlignError, Result};

/// Limits that send a registration back to its starting position.
///
/// Every limit is optional; with all of them unset a registration never resets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetThresholds {
    /// Reset when the final z-score is below this.
    pub min_confidence: Option<f64>,
    /// Reset when the net x movement exceeds this many pixels.
    pub max_dx: Option<f64>,
    /// Reset when the net y movement exceeds this many pixels.
    pub max_dy: Option<f64>,
}

/// Settings for a correlate/move registration of one window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Correlation window width in pixels (default: 256).
    pub window_width: usize,
    /// Correlation window height in pixels (default: 256).
    pub window_height: usize,
    /// Correlate/move passes (default: 2, at most 999).
    pub iterations: usize,
    /// Cross-power whitening exponent (default: -0.65).
    pub whiten_exponent: f64,
    /// Taper patches with a Tukey window (default: true).
    pub apodize: bool,
    /// Keep the pattern fixed along x.
    pub freeze_x: bool,
    /// Keep the pattern fixed along y.
    pub freeze_y: bool,
    pub reset: ResetThresholds,
    pub peak: PeakConfig,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            window_width: 256,
            window_height: 256,
            iterations: DEFAULT_ITERATIONS,
            whiten_exponent: DEFAULT_WHITEN_EXPONENT,
            apodize: true,
            freeze_x: false,
            freeze_y: false,
            reset: ResetThresholds::default(),
            peak: PeakConfig::default(),
        }
    }
}

impl RegistrationConfig {
    /// Square window of `size` pixels, other settings default.
    pub fn with_window(size: usize) -> Self {
        Self {
            window_width: size,
            window_height: size,
            ..Default::default()
        }
    }

    pub fn correlation(&self) -> CorrelationParams {
        CorrelationParams {
            apodize: self.apodize,
            whiten_exponent: self.whiten_exponent,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_width < 4 || self.window_height < 4 {
            return Err(AlignError::InvalidConfig(format!(
                "window {}x{} is smaller than 4x4",
                self.window_width, self.window_height
            )));
        }
        if self.iterations == 0 || self.iterations > MAX_ITERATIONS {
            return Err(AlignError::InvalidConfig(format!(
                "iterations must be within 1..={MAX_ITERATIONS}, got {}",
                self.iterations
            )));
        }
        if !self.whiten_exponent.is_finite() {
            return Err(AlignError::InvalidConfig(
                "whitening exponent must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where to register: target and pattern window centres and the starting shape.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegistrationRequest {
    /// Target window centre, rounded to whole pixels. Defaults to the image centre.
    pub target_center: Option<Point2>,
    /// Starting pattern window centre. Defaults to the image centre.
    pub pattern_center: Option<Point2>,
    /// Rotation/shear applied when sampling the pattern window.
    pub shape: AffineShape,
}

impl RegistrationRequest {
    pub fn at(target_center: Point2, pattern_center: Point2) -> Self {
        Self {
            target_center: Some(target_center),
            pattern_center: Some(pattern_center),
            shape: AffineShape::identity(),
        }
    }

    /// Start from where `map` (target → pattern) predicts `target_center` lands,
    /// sampling the pattern through the map's linear part.
    pub fn predicted(target_center: Point2, map: &AffineMap) -> Self {
        Self {
            target_center: Some(target_center),
            pattern_center: Some(map.apply(target_center)),
            shape: map.shape(),
        }
    }

    pub fn with_shape(mut self, shape: AffineShape) -> Self {
        self.shape = shape;
        self
    }
}
