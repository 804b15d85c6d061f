use crate::affine::AffineMap;

/// Outcome of one register-and-refit pass of the recipe.
#[derive(Clone, Debug, PartialEq)]
pub struct PassReport {
    /// Windows per side in this stage.
    pub grid: usize,
    /// Zero-based pass index within the stage.
    pub pass: usize,
    /// Correspondences used for the fit.
    pub points: usize,
    /// Windows dropped because they reset, failed or were too uncertain.
    pub discarded: usize,
    /// Indices (row-major window order) rejected by the solver.
    pub rejected: Vec<usize>,
    pub rms: f64,
    pub mean_confidence: f64,
    /// Map after this pass.
    pub map: AffineMap,
}

/// Result of [`super::align_images`].
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentResult {
    /// Maps target coordinates onto pattern coordinates.
    pub map: AffineMap,
    pub passes: Vec<PassReport>,
}

impl AlignmentResult {
    pub fn final_rms(&self) -> Option<f64> {
        self.passes.last().map(|p| p.rms)
    }
}

/// Progress reporting for the recipe.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A stage with `windows` windows and `passes` passes has started.
    fn begin_stage(&self, _grid: usize, _windows: usize, _passes: usize) {}

    /// One pass of the current stage is finished.
    fn pass_finished(&self, _report: &PassReport) {}

    /// The whole recipe is finished.
    fn finish(&self) {}
}

pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
