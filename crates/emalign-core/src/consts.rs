/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum window count to register a batch in parallel.
pub const PARALLEL_WINDOW_THRESHOLD: usize = 2;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-10;

/// Determinant magnitude below which an affine map has no inverse.
pub const SINGULAR_DETERMINANT: f64 = 1e-9;

/// Pivot magnitude, relative to the largest matrix entry, below which
/// Gauss-Jordan elimination reports a degenerate system.
pub const RELATIVE_PIVOT_FLOOR: f64 = 1e-12;

/// Cross-power magnitudes at or below this are left unwhitened.
pub const WHITEN_MAGNITUDE_FLOOR: f64 = 1e-5;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f64 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f64 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f64 = 0.114;

// ---------------------------------------------------------------------------
// Correlation defaults
// ---------------------------------------------------------------------------

/// Default spectral whitening exponent. Tuned on TEM montage tiles; callers
/// should treat it as a starting point.
pub const DEFAULT_WHITEN_EXPONENT: f64 = -0.65;

/// Default number of correlate/move iterations per registration.
pub const DEFAULT_ITERATIONS: usize = 2;

/// Upper bound on the iteration budget accepted from configuration.
pub const MAX_ITERATIONS: usize = 999;

/// Fraction of the tapered band on each side of a Tukey window (0.2 = outer 20%).
pub const TUKEY_TAPER_FRACTION: f64 = 0.2;

/// Cells contribute to the sub-pixel marginals when their depth is at least
/// this fraction of the peak z-score.
pub const PEAK_THRESHOLD_SCALE: f64 = 0.5;

/// Divisor of the exponential excess weight `exp(depth / scale)`.
pub const PEAK_WEIGHT_SCALE: f64 = 10.0;

/// Minimum total marginal mass for a usable peak.
pub const MIN_MARGINAL_MASS: f64 = 1.0;

/// Uncertainty (pixels) above which a peak estimate is considered unreliable.
pub const UNRELIABLE_UNCERTAINTY: f64 = 8.0;

// ---------------------------------------------------------------------------
// Solver defaults and capacities
// ---------------------------------------------------------------------------

/// Default RMS threshold (pixels) above which the worst point is rejected.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 3.0;

/// Default number of points the outlier rejection never goes below.
pub const DEFAULT_MIN_POINTS_TO_KEEP: usize = 4;

/// Maximum number of correspondences accepted by the solver.
pub const MAX_CORRESPONDENCES: usize = 1000;

/// Maximum number of mesh vertices.
pub const MAX_MESH_VERTICES: usize = 60_000;

/// Maximum number of mesh triangles.
pub const MAX_MESH_TRIANGLES: usize = 20_000;

/// Maximum number of mesh quads.
pub const MAX_MESH_QUADS: usize = 20_000;
