use std::collections::HashMap;
use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Row and column transforms for one `(width, height)`.
#[derive(Clone)]
pub struct Plan2d {
    row_forward: Arc<dyn Fft<f64>>,
    col_forward: Arc<dyn Fft<f64>>,
    row_inverse: Arc<dyn Fft<f64>>,
    col_inverse: Arc<dyn Fft<f64>>,
}

/// 2D FFT plans keyed by `(width, height)`.
///
/// Plans are created on first use and never replaced, so a cache must not be
/// shared between threads; give each worker its own instance.
pub struct FftPlanCache {
    planner: FftPlanner<f64>,
    plans: HashMap<(usize, usize), Plan2d>,
}

impl Default for FftPlanCache {
    fn default() -> Self {
        Self {
            planner: FftPlanner::new(),
            plans: HashMap::new(),
        }
    }
}

impl FftPlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct sizes planned so far.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn plan(&mut self, width: usize, height: usize) -> Plan2d {
        let planner = &mut self.planner;
        self.plans
            .entry((width, height))
            .or_insert_with(|| Plan2d {
                row_forward: planner.plan_fft_forward(width),
                col_forward: planner.plan_fft_forward(height),
                row_inverse: planner.plan_fft_inverse(width),
                col_inverse: planner.plan_fft_inverse(height),
            })
            .clone()
    }

    /// Forward 2D FFT of a real patch.
    pub fn forward(&mut self, data: &Array2<f64>) -> Array2<Complex<f64>> {
        let (h, w) = data.dim();
        let plan = self.plan(w, h);
        let mut result = data.mapv(|v| Complex::new(v, 0.0));
        transform_2d(&mut result, &plan.row_forward, &plan.col_forward);
        result
    }

    /// Inverse 2D FFT, returning the real part normalized by `1/(h*w)`.
    pub fn inverse_real(&mut self, data: &Array2<Complex<f64>>) -> Array2<f64> {
        let (h, w) = data.dim();
        let plan = self.plan(w, h);
        let mut work = data.clone();
        transform_2d(&mut work, &plan.row_inverse, &plan.col_inverse);
        let scale = 1.0 / (h * w) as f64;
        work.mapv(|v| v.re * scale)
    }
}

fn transform_2d(data: &mut Array2<Complex<f64>>, fft_row: &Arc<dyn Fft<f64>>, fft_col: &Arc<dyn Fft<f64>>) {
    let (h, w) = data.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        transform_2d_parallel(data, fft_row, fft_col, h, w);
    } else {
        transform_2d_sequential(data, fft_row, fft_col, h, w);
    }
}

fn transform_2d_parallel(
    data: &mut Array2<Complex<f64>>,
    fft_row: &Arc<dyn Fft<f64>>,
    fft_col: &Arc<dyn Fft<f64>>,
    h: usize,
    w: usize,
) {
    let processed_rows: Vec<Vec<Complex<f64>>> = (0..h)
        .into_par_iter()
        .map(|row| {
            let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| data[[row, c]]).collect();
            fft_row.process(&mut row_data);
            row_data
        })
        .collect();
    for (row, row_data) in processed_rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            data[[row, col]] = val;
        }
    }

    let processed_cols: Vec<Vec<Complex<f64>>> = (0..w)
        .into_par_iter()
        .map(|col| {
            let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| data[[r, col]]).collect();
            fft_col.process(&mut col_data);
            col_data
        })
        .collect();
    for (col, col_data) in processed_cols.into_iter().enumerate() {
        for (row, val) in col_data.into_iter().enumerate() {
            data[[row, col]] = val;
        }
    }
}

fn transform_2d_sequential(
    data: &mut Array2<Complex<f64>>,
    fft_row: &Arc<dyn Fft<f64>>,
    fft_col: &Arc<dyn Fft<f64>>,
    h: usize,
    w: usize,
) {
    let mut row_data = vec![Complex::new(0.0, 0.0); w];
    for row in 0..h {
        for col in 0..w {
            row_data[col] = data[[row, col]];
        }
        fft_row.process(&mut row_data);
        for col in 0..w {
            data[[row, col]] = row_data[col];
        }
    }
    let mut col_data = vec![Complex::new(0.0, 0.0); h];
    for col in 0..w {
        for row in 0..h {
            col_data[row] = data[[row, col]];
        }
        fft_col.process(&mut col_data);
        for row in 0..h {
            data[[row, col]] = col_data[row];
        }
    }
}

/// Swap quadrants so that index `(0, 0)` moves to `(h/2, w/2)`.
pub fn fftshift(data: &Array2<f64>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut out = Array2::<f64>::zeros((h, w));
    for ((row, col), &v) in data.indexed_iter() {
        out[[(row + h / 2) % h, (col + w / 2) % w]] = v;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_inverse_identity() {
        let data = Array2::from_shape_fn((6, 10), |(r, c)| (r * 10 + c) as f64 * 0.5);
        let mut cache = FftPlanCache::new();
        let spectrum = cache.forward(&data);
        let back = cache.inverse_real(&spectrum);
        for (a, b) in data.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_default_cache_is_empty() {
        let mut cache = FftPlanCache::default();
        assert!(cache.is_empty());
        cache.plan(8, 4);
        cache.plan(8, 4);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fftshift_odd_size() {
        let mut data = Array2::<f64>::zeros((5, 7));
        data[[0, 0]] = 1.0;
        let shifted = fftshift(&data);
        assert_eq!(shifted[[2, 3]], 1.0);
    }
}
