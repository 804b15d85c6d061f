use ndarray::Array2;

use crate::affine::{AffineShape, Point2};
use crate::pixel::PixelBuffer;

/// Mean and spread of a patch's samples.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PatchStats {
    pub mean: f64,
    /// Sample variance (`n - 1` denominator).
    pub variance: f64,
    pub std_dev: f64,
}

impl PatchStats {
    pub fn of(patch: &Array2<f64>) -> Self {
        let n = patch.len();
        if n == 0 {
            return Self::default();
        }
        let mean = patch.sum() / n as f64;
        let variance = if n > 1 {
            patch.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Self {
            mean,
            variance,
            std_dev: variance.sqrt(),
        }
    }

    /// A patch with no contrast cannot be correlated.
    pub fn is_flat(&self) -> bool {
        self.std_dev < 1e-6
    }
}

/// Copy a `width` x `height` window of grey levels whose centre cell
/// `(width/2, height/2)` is the image pixel nearest `center`.
///
/// Cells falling outside the image take the mean of the cells inside it.
pub fn extract_window(image: &PixelBuffer, center: Point2, width: usize, height: usize) -> Array2<f64> {
    let x0 = center.x.round() as isize - (width / 2) as isize;
    let y0 = center.y.round() as isize - (height / 2) as isize;
    let mut patch = Array2::<f64>::from_elem((height, width), f64::NAN);
    for row in 0..height {
        for col in 0..width {
            let (x, y) = (x0 + col as isize, y0 + row as isize);
            if image.contains(x, y) {
                patch[[row, col]] = image.luma(x as usize, y as usize);
            }
        }
    }
    fill_missing_with_mean(&mut patch);
    patch
}

/// Sample a `width` x `height` patch around a sub-pixel `center` through `shape`.
///
/// Cell `(col, row)` reads the image at `center + shape·(col - width/2, row - height/2)`
/// with bilinear interpolation. Cells outside the image take the patch mean.
pub fn extract_shaped(
    image: &PixelBuffer,
    center: Point2,
    shape: &AffineShape,
    width: usize,
    height: usize,
) -> Array2<f64> {
    let mut patch = Array2::<f64>::from_elem((height, width), f64::NAN);
    for row in 0..height {
        let oy = row as f64 - (height / 2) as f64;
        for col in 0..width {
            let ox = col as f64 - (width / 2) as f64;
            let (dx, dy) = shape.apply(ox, oy);
            if let Some(v) = bilinear_luma(image, center.x + dx, center.y + dy) {
                patch[[row, col]] = v;
            }
        }
    }
    fill_missing_with_mean(&mut patch);
    patch
}

/// Bilinear grey level, `None` outside `[0, w-1] x [0, h-1]`.
pub fn bilinear_luma(image: &PixelBuffer, x: f64, y: f64) -> Option<f64> {
    let (w, h) = (image.width(), image.height());
    if !(x >= 0.0 && y >= 0.0 && x <= (w - 1) as f64 && y <= (h - 1) as f64) {
        return None;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let top = image.luma(x0, y0) * (1.0 - fx) + image.luma(x1, y0) * fx;
    let bottom = image.luma(x0, y1) * (1.0 - fx) + image.luma(x1, y1) * fx;
    Some(top * (1.0 - fy) + bottom * fy)
}

fn fill_missing_with_mean(patch: &mut Array2<f64>) {
    let (sum, count) = patch
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
    patch.mapv_inplace(|v| if v.is_nan() { mean } else { v });
}
