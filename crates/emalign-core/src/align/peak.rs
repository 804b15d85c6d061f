use std::collections::VecDeque;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    EPSILON, MIN_MARGINAL_MASS, PEAK_THRESHOLD_SCALE, PEAK_WEIGHT_SCALE, UNRELIABLE_UNCERTAINTY,
};

use super::spectral::CorrelationSurface;

/// Tuning of the sub-pixel peak estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// A cell contributes to the marginals when its depth below the mean,
    /// in standard deviations, is at least this fraction of the peak z-score
    /// (default: 0.5).
    pub threshold_scale: f64,
    /// Contributing cells weigh `exp(depth / weight_scale)` (default: 10).
    pub weight_scale: f64,
    /// Minimum marginal mass for a usable estimate (default: 1.0).
    pub min_mass: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            threshold_scale: PEAK_THRESHOLD_SCALE,
            weight_scale: PEAK_WEIGHT_SCALE,
            min_mass: MIN_MARGINAL_MASS,
        }
    }
}

/// Sub-pixel location of a correlation minimum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakEstimate {
    /// Offset of the peak from the surface centre, in cells.
    pub dx: f64,
    pub dy: f64,
    /// Integer cell `(col, row)` holding the minimum.
    pub cell: (usize, usize),
    /// `(mean - min) / stddev` of the surface.
    pub confidence: f64,
    /// Euclidean norm of the 10%–90% marginal widths; infinite when there is no signal.
    pub uncertainty: f64,
}

impl PeakEstimate {
    fn no_signal(cell: (usize, usize), confidence: f64) -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            cell,
            confidence,
            uncertainty: f64::INFINITY,
        }
    }

    pub fn has_signal(&self) -> bool {
        self.uncertainty.is_finite()
    }

    /// True when the uncertainty is below `max_uncertainty`.
    pub fn is_reliable(&self, max_uncertainty: f64) -> bool {
        self.uncertainty < max_uncertainty
    }

    /// [`PeakEstimate::is_reliable`] with the default bound.
    pub fn is_reliable_default(&self) -> bool {
        self.is_reliable(UNRELIABLE_UNCERTAINTY)
    }
}

/// Finds the strongest anti-correlation in a [`CorrelationSurface`].
#[derive(Clone, Debug, Default)]
pub struct PeakLocator {
    config: PeakConfig,
}

impl PeakLocator {
    pub fn new(config: PeakConfig) -> Self {
        Self { config }
    }

    pub fn locate(&self, surface: &CorrelationSurface) -> PeakEstimate {
        let values = &surface.values;
        let (h, w) = values.dim();
        let n = values.len() as f64;

        let mean = values.sum() / n;
        let std_dev = (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt();

        let mut min = f64::INFINITY;
        let mut cell = (w / 2, h / 2);
        for ((row, col), &v) in values.indexed_iter() {
            if v < min {
                min = v;
                cell = (col, row);
            }
        }

        if std_dev < EPSILON || !std_dev.is_finite() {
            debug!("flat correlation surface");
            return PeakEstimate::no_signal(cell, 0.0);
        }
        let confidence = (mean - min) / std_dev;
        let threshold = self.config.threshold_scale * confidence;

        let depth = |v: f64| (mean - v) / std_dev;
        let weight = |v: f64| (depth(v) / self.config.weight_scale).exp();

        // The location comes from the basin of the minimum only; the spread
        // covers every cell above threshold so competing lobes widen it.
        let mut spread_x = vec![0.0; w];
        let mut spread_y = vec![0.0; h];
        for ((row, col), &v) in values.indexed_iter() {
            if depth(v) >= threshold {
                spread_x[col] += weight(v);
                spread_y[row] += weight(v);
            }
        }
        let mut basin_x = vec![0.0; w];
        let mut basin_y = vec![0.0; h];
        for (col, row) in basin(values, cell, |v| depth(v) >= threshold) {
            let wgt = weight(values[[row, col]]);
            basin_x[col] += wgt;
            basin_y[row] += wgt;
        }

        let min_mass = self.config.min_mass;
        let (Some(x), Some(y), Some(sx), Some(sy)) = (
            Marginal::new(&basin_x, min_mass),
            Marginal::new(&basin_y, min_mass),
            Marginal::new(&spread_x, min_mass),
            Marginal::new(&spread_y, min_mass),
        ) else {
            debug!(confidence, "correlation marginal mass below minimum");
            return PeakEstimate::no_signal(cell, confidence);
        };

        let (cx, cy) = surface.center();
        let width_x = sx.quantile(0.9) - sx.quantile(0.1);
        let width_y = sy.quantile(0.9) - sy.quantile(0.1);
        PeakEstimate {
            dx: x.quantile(0.5) - cx as f64,
            dy: y.quantile(0.5) - cy as f64,
            cell,
            confidence,
            uncertainty: width_x.hypot(width_y),
        }
    }
}

/// Cells `(col, row)` 4-connected to `seed` through cells accepted by `inside`.
fn basin(values: &Array2<f64>, seed: (usize, usize), inside: impl Fn(f64) -> bool) -> Vec<(usize, usize)> {
    let (h, w) = values.dim();
    let mut seen = Array2::from_elem((h, w), false);
    let mut cells = Vec::new();
    let mut queue = VecDeque::from([seed]);
    seen[[seed.1, seed.0]] = true;
    while let Some((col, row)) = queue.pop_front() {
        cells.push((col, row));
        let neighbours = [
            (col.wrapping_sub(1), row),
            (col + 1, row),
            (col, row.wrapping_sub(1)),
            (col, row + 1),
        ];
        for (c, r) in neighbours {
            if c < w && r < h && !seen[[r, c]] && inside(values[[r, c]]) {
                seen[[r, c]] = true;
                queue.push_back((c, r));
            }
        }
    }
    cells
}

/// Cumulative 1D profile; bin `i` spans `[i - 0.5, i + 0.5]`.
struct Marginal {
    cumulative: Vec<f64>,
}

impl Marginal {
    fn new(bins: &[f64], min_mass: f64) -> Option<Self> {
        let mut total = 0.0;
        let cumulative: Vec<f64> = bins
            .iter()
            .map(|b| {
                total += b;
                total
            })
            .collect();
        (total >= min_mass && total > 0.0).then_some(Self { cumulative })
    }

    /// Position where the cumulative mass reaches `fraction` of the total,
    /// interpolated linearly inside the bracketing bin.
    fn quantile(&self, fraction: f64) -> f64 {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        let target = fraction * total;
        let mut below = 0.0;
        for (i, &c) in self.cumulative.iter().enumerate() {
            if c >= target {
                let bin = c - below;
                let t = if bin > 0.0 { (target - below) / bin } else { 0.5 };
                return i as f64 - 0.5 + t;
            }
            below = c;
        }
        self.cumulative.len() as f64 - 0.5
    }
}
