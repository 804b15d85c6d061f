use crate::affine::{AffineShape, Point2};
use crate::align::PeakEstimate;

/// Where a registration is in its correlate/move cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationPhase {
    Init,
    /// Target spectrum ready, pattern window about to be sampled.
    Prepared,
    Correlating,
    Converged,
    /// Result rejected, pattern returned to its starting position.
    Reset,
}

impl std::fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "Init"),
            Self::Prepared => write!(f, "Prepared"),
            Self::Correlating => write!(f, "Correlating"),
            Self::Converged => write!(f, "Converged"),
            Self::Reset => write!(f, "Reset"),
        }
    }
}

/// Why a registration was reset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResetReport {
    pub low_confidence: bool,
    pub x_exceeded: bool,
    pub y_exceeded: bool,
    /// Pattern centre the loop had converged to before the reset.
    pub rejected_center: Point2,
}

/// Mutable state of one registration.
#[derive(Clone, Debug)]
pub struct RegistrationState {
    pub phase: RegistrationPhase,
    pub start: Point2,
    pub pattern_center: Point2,
    pub shape: AffineShape,
    /// Most recent peak.
    pub last_peak: Option<PeakEstimate>,
    /// Highest z-score seen over all iterations.
    pub best_confidence: f64,
    pub iteration: usize,
    pub reset: Option<ResetReport>,
}

impl RegistrationState {
    pub fn new(start: Point2, shape: AffineShape) -> Self {
        Self {
            phase: RegistrationPhase::Init,
            start,
            pattern_center: start,
            shape,
            last_peak: None,
            best_confidence: 0.0,
            iteration: 0,
            reset: None,
        }
    }

    pub fn prepared(&mut self) {
        debug_assert!(matches!(
            self.phase,
            RegistrationPhase::Init | RegistrationPhase::Correlating
        ));
        self.phase = RegistrationPhase::Prepared;
    }

    pub fn correlating(&mut self) {
        debug_assert_eq!(self.phase, RegistrationPhase::Prepared);
        self.phase = RegistrationPhase::Correlating;
    }

    /// Record a peak and move the pattern by `(dx, dy)` target pixels.
    pub fn advance(&mut self, peak: PeakEstimate, dx: f64, dy: f64) {
        debug_assert_eq!(self.phase, RegistrationPhase::Correlating);
        self.pattern_center.x += dx;
        self.pattern_center.y += dy;
        self.best_confidence = self.best_confidence.max(peak.confidence);
        self.last_peak = Some(peak);
        self.iteration += 1;
        self.prepared();
    }

    pub fn converge(&mut self) {
        self.phase = RegistrationPhase::Converged;
    }

    pub fn reset_to_start(&mut self, low_confidence: bool, x_exceeded: bool, y_exceeded: bool) {
        self.reset = Some(ResetReport {
            low_confidence,
            x_exceeded,
            y_exceeded,
            rejected_center: self.pattern_center,
        });
        self.pattern_center = self.start;
        self.phase = RegistrationPhase::Reset;
    }

    /// Net movement of the pattern centre since the start.
    pub fn displacement(&self) -> (f64, f64) {
        (
            self.pattern_center.x - self.start.x,
            self.pattern_center.y - self.start.y,
        )
    }
}
