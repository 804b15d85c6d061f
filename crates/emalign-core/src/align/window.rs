use ndarray::Array2;

use crate::consts::EPSILON;

/// One axis of a Tukey window: flat in the middle, raised-cosine taper over
/// the outer `taper` fraction of each half, reaching zero at the edges.
pub fn tukey_profile(n: usize, taper: f64) -> Vec<f64> {
    let half = n as f64 / 2.0;
    let flat = 1.0 - taper.clamp(0.0, 1.0);
    (0..n)
        .map(|i| {
            let d = (i as f64 - half).abs() / half;
            if d <= flat || taper <= 0.0 {
                1.0
            } else {
                0.5 + 0.5 * (std::f64::consts::PI * (d - flat) / taper).cos()
            }
        })
        .collect()
}

/// Separable 2D Tukey window of shape `(height, width)`.
pub fn tukey_window(width: usize, height: usize, taper: f64) -> Array2<f64> {
    let wx = tukey_profile(width, taper);
    let wy = tukey_profile(height, taper);
    Array2::from_shape_fn((height, width), |(row, col)| wy[row] * wx[col])
}

/// Subtract the window-weighted mean, then taper by the window.
pub fn apodize(patch: &mut Array2<f64>, window: &Array2<f64>) {
    let weight: f64 = window.sum();
    let mean = if weight > EPSILON {
        patch.iter().zip(window.iter()).map(|(v, w)| v * w).sum::<f64>() / weight
    } else {
        0.0
    };
    patch.zip_mut_with(window, |v, &w| *v = (*v - mean) * w);
}
