use tracing::{debug, warn};

use crate::affine::{AffineShape, Correspondence, Point2};
use crate::align::{
    extract_shaped, extract_window, PeakLocator, SpectralCorrelator, Spectrum,
};
use crate::error::Result;
use crate::pixel::PixelBuffer;

use super::config::{RegistrationConfig, RegistrationRequest};
use super::state::{RegistrationPhase, RegistrationState, ResetReport};

/// Final report of one registration.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistrationOutcome {
    /// Target window centre actually used (whole pixels).
    pub target_center: Point2,
    /// Final pattern centre; equal to `start` after a reset.
    pub pattern_center: Point2,
    pub start: Point2,
    /// `pattern_center - start`.
    pub dx: f64,
    pub dy: f64,
    pub shape: AffineShape,
    /// Rotation of `shape` in degrees.
    pub rotation_degrees: f64,
    /// z-score of the last correlation.
    pub confidence: f64,
    pub best_confidence: f64,
    pub uncertainty: f64,
    pub iterations: usize,
    pub phase: RegistrationPhase,
    pub reset: Option<ResetReport>,
    /// Net move exceeded a quarter of the window width.
    pub far_x: bool,
    /// Net move exceeded a quarter of the window height.
    pub far_y: bool,
}

impl RegistrationOutcome {
    pub fn is_reset(&self) -> bool {
        self.reset.is_some()
    }

    /// Target centre matched to the final pattern centre.
    pub fn correspondence(&self) -> Correspondence {
        Correspondence::new(self.target_center, self.pattern_center)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TargetKey {
    x: i64,
    y: i64,
    width: usize,
    height: usize,
    apodize: bool,
}

/// Registers windows of a pattern image against a target image.
///
/// The target window's spectrum is kept between calls and recomputed only
/// when its centre, size or apodization changes.
pub struct Registrar<'a> {
    target: &'a PixelBuffer,
    pattern: &'a PixelBuffer,
    config: RegistrationConfig,
    correlator: SpectralCorrelator,
    locator: PeakLocator,
    target_cache: Option<(TargetKey, Spectrum)>,
}

impl<'a> Registrar<'a> {
    pub fn new(
        target: &'a PixelBuffer,
        pattern: &'a PixelBuffer,
        config: RegistrationConfig,
    ) -> Result<Self> {
        config.validate()?;
        let locator = PeakLocator::new(config.peak.clone());
        Ok(Self {
            target,
            pattern,
            config,
            correlator: SpectralCorrelator::new(),
            locator,
            target_cache: None,
        })
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Change the window size and other settings, keeping the plan cache.
    pub fn set_config(&mut self, config: RegistrationConfig) -> Result<()> {
        config.validate()?;
        self.locator = PeakLocator::new(config.peak.clone());
        self.config = config;
        Ok(())
    }

    /// Centre and size of the target window whose spectrum is cached.
    pub fn cached_target(&self) -> Option<(Point2, usize, usize)> {
        self.target_cache
            .as_ref()
            .map(|(k, _)| (Point2::new(k.x as f64, k.y as f64), k.width, k.height))
    }

    pub fn register(&mut self, request: &RegistrationRequest) -> Result<RegistrationOutcome> {
        let (w, h) = (self.config.window_width, self.config.window_height);
        let target_center = request
            .target_center
            .unwrap_or_else(|| image_center(self.target));
        let target_center = Point2::new(target_center.x.round(), target_center.y.round());
        let start = request
            .pattern_center
            .unwrap_or_else(|| image_center(self.pattern));

        let mut state = RegistrationState::new(start, request.shape);
        let target_spectrum = self.target_spectrum(target_center);
        if target_spectrum.stats.is_flat() {
            warn!(x = target_center.x, y = target_center.y, "target window has no contrast");
        }
        state.prepared();

        let params = self.config.correlation();
        while state.iteration < self.config.iterations {
            state.correlating();
            let patch = extract_shaped(self.pattern, state.pattern_center, &state.shape, w, h);
            let spectrum = self.correlator.transform(&patch, params.apodize);
            let surface = self.correlator.correlate_spectra(
                &target_spectrum,
                &spectrum,
                params.whiten_exponent,
            )?;
            let peak = self.locator.locate(&surface);

            let (mut dx, mut dy) = state.shape.apply(peak.dx, peak.dy);
            if self.config.freeze_x {
                dx = 0.0;
            }
            if self.config.freeze_y {
                dy = 0.0;
            }
            debug!(
                iteration = state.iteration,
                dx,
                dy,
                z = peak.confidence,
                uncertainty = peak.uncertainty,
                "registration step"
            );
            state.advance(peak, dx, dy);
        }

        let (net_dx, net_dy) = state.displacement();
        let far_x = net_dx.abs() > w as f64 / 4.0;
        let far_y = net_dy.abs() > h as f64 / 4.0;
        let (confidence, uncertainty) = state
            .last_peak
            .map_or((0.0, f64::INFINITY), |p| (p.confidence, p.uncertainty));

        let limits = &self.config.reset;
        let low_confidence = limits.min_confidence.is_some_and(|min| confidence < min);
        let x_exceeded = limits.max_dx.is_some_and(|max| net_dx.abs() > max);
        let y_exceeded = limits.max_dy.is_some_and(|max| net_dy.abs() > max);
        if low_confidence || x_exceeded || y_exceeded {
            warn!(
                confidence,
                dx = net_dx,
                dy = net_dy,
                "registration reset to starting position"
            );
            state.reset_to_start(low_confidence, x_exceeded, y_exceeded);
        } else {
            state.converge();
        }

        let (dx, dy) = state.displacement();
        Ok(RegistrationOutcome {
            target_center,
            pattern_center: state.pattern_center,
            start,
            dx,
            dy,
            shape: state.shape,
            rotation_degrees: state.shape.rotation_degrees(),
            confidence,
            best_confidence: state.best_confidence,
            uncertainty,
            iterations: state.iteration,
            phase: state.phase,
            reset: state.reset,
            far_x,
            far_y,
        })
    }

    fn target_spectrum(&mut self, center: Point2) -> Spectrum {
        let key = TargetKey {
            x: center.x as i64,
            y: center.y as i64,
            width: self.config.window_width,
            height: self.config.window_height,
            apodize: self.config.apodize,
        };
        if let Some((cached, spectrum)) = &self.target_cache {
            if *cached == key {
                debug!(x = key.x, y = key.y, "reusing cached target spectrum");
                return spectrum.clone();
            }
        }
        let patch = extract_window(self.target, center, key.width, key.height);
        let spectrum = self.correlator.transform(&patch, key.apodize);
        self.target_cache = Some((key, spectrum.clone()));
        spectrum
    }
}

/// Default window centre of an image.
pub fn image_center(image: &PixelBuffer) -> Point2 {
    Point2::new((image.width() / 2) as f64, (image.height() / 2) as f64)
}
