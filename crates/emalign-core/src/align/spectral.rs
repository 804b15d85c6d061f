use std::collections::HashMap;

use ndarray::{Array2, Zip};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_WHITEN_EXPONENT, TUKEY_TAPER_FRACTION, WHITEN_MAGNITUDE_FLOOR};
use crate::error::{AlignError, Result};

use super::fft::{fftshift, FftPlanCache};
use super::patch::PatchStats;
use super::window::{apodize, tukey_window};

/// Settings for one correlation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationParams {
    /// Taper both patches with a Tukey window before transforming.
    pub apodize: bool,
    /// Each cross-power bin is scaled by `|X|^whiten_exponent`.
    /// `0` keeps plain correlation, `-1` gives phase correlation.
    pub whiten_exponent: f64,
}

impl Default for CorrelationParams {
    fn default() -> Self {
        Self {
            apodize: true,
            whiten_exponent: DEFAULT_WHITEN_EXPONENT,
        }
    }
}

/// Forward transform of a prepared patch, with the patch's statistics
/// measured before windowing.
#[derive(Clone, Debug)]
pub struct Spectrum {
    pub data: Array2<Complex<f64>>,
    pub stats: PatchStats,
    pub apodized: bool,
}

impl Spectrum {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// Negated, centre-shifted cross-correlation of two patches.
///
/// The best match is the surface minimum. A cell at `(width/2 + dx, height/2 + dy)`
/// means the pattern patch content sits `(dx, dy)` further along than the target's.
#[derive(Clone, Debug)]
pub struct CorrelationSurface {
    /// Shape `(height, width)`.
    pub values: Array2<f64>,
}

impl CorrelationSurface {
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    /// Cell corresponding to zero displacement.
    pub fn center(&self) -> (usize, usize) {
        (self.width() / 2, self.height() / 2)
    }
}

/// FFT cross-correlator with a per-instance plan and window cache.
#[derive(Default)]
pub struct SpectralCorrelator {
    plans: FftPlanCache,
    windows: HashMap<(usize, usize), Array2<f64>>,
}

impl SpectralCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct patch sizes planned so far.
    pub fn cached_sizes(&self) -> usize {
        self.plans.len()
    }

    /// Measure, optionally apodize, and forward-transform a patch.
    pub fn transform(&mut self, patch: &Array2<f64>, apodize_patch: bool) -> Spectrum {
        let stats = PatchStats::of(patch);
        let (h, w) = patch.dim();
        let data = if apodize_patch {
            let window = self
                .windows
                .entry((w, h))
                .or_insert_with(|| tukey_window(w, h, TUKEY_TAPER_FRACTION));
            let mut tapered = patch.clone();
            apodize(&mut tapered, window);
            self.plans.forward(&tapered)
        } else {
            self.plans.forward(patch)
        };
        Spectrum {
            data,
            stats,
            apodized: apodize_patch,
        }
    }

    /// Correlate two already transformed patches.
    pub fn correlate_spectra(
        &mut self,
        target: &Spectrum,
        pattern: &Spectrum,
        whiten_exponent: f64,
    ) -> Result<CorrelationSurface> {
        if target.data.dim() != pattern.data.dim() {
            return Err(AlignError::SizeMismatch(
                target.width(),
                target.height(),
                pattern.width(),
                pattern.height(),
            ));
        }

        let mut cross = Array2::<Complex<f64>>::zeros(target.data.dim());
        Zip::from(&mut cross)
            .and(&target.data)
            .and(&pattern.data)
            .for_each(|x, t, p| *x = whiten(t.conj() * p, whiten_exponent));

        let surface = self.plans.inverse_real(&cross).mapv(|v| -v);
        Ok(CorrelationSurface {
            values: fftshift(&surface),
        })
    }

    /// Correlate `pattern` against `target`; both patches must be the same size.
    pub fn correlate(
        &mut self,
        target: &Array2<f64>,
        pattern: &Array2<f64>,
        params: &CorrelationParams,
    ) -> Result<CorrelationSurface> {
        if target.dim() != pattern.dim() {
            return Err(AlignError::SizeMismatch(
                target.ncols(),
                target.nrows(),
                pattern.ncols(),
                pattern.nrows(),
            ));
        }
        let t = self.transform(target, params.apodize);
        let p = self.transform(pattern, params.apodize);
        self.correlate_spectra(&t, &p, params.whiten_exponent)
    }
}

fn whiten(x: Complex<f64>, exponent: f64) -> Complex<f64> {
    if exponent == 0.0 {
        return x;
    }
    let magnitude = x.norm();
    if magnitude <= WHITEN_MAGNITUDE_FLOOR {
        return x;
    }
    x * magnitude.powf(exponent)
}
