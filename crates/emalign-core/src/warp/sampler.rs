use serde::{Deserialize, Serialize};

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::error::{AlignError, Result};
use crate::pixel::{PixelBuffer, PixelFormat};

/// Resampling quality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    /// 4x4 Catmull-Rom. Needs one source pixel of margin on the low side
    /// and two on the high side; pixels without it are left untouched.
    Bicubic,
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "Nearest"),
            Self::Bilinear => write!(f, "Bilinear"),
            Self::Bicubic => write!(f, "Bicubic"),
        }
    }
}

/// Coordinates within this distance of a whole pixel are snapped to it.
const SNAP_TOLERANCE: f64 = 1e-9;

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < SNAP_TOLERANCE {
        r
    } else {
        v
    }
}

/// A source pixel whose every channel equals the skip value carries no data.
#[inline]
fn is_skip(src: &PixelBuffer, x: usize, y: usize, skip: Option<u32>) -> bool {
    match skip {
        Some(s) => (0..src.format().channels()).all(|ch| src.sample(x, y, ch) == s),
        None => false,
    }
}

/// Interpolates every channel of `src` at a sub-pixel position.
pub(crate) trait Kernel {
    /// Fill `out[..channels]`; `false` leaves the destination pixel untouched.
    fn sample(&self, src: &PixelBuffer, x: f64, y: f64, skip: Option<u32>, out: &mut [f64; 3]) -> bool;
}

pub(crate) struct NearestKernel;

impl Kernel for NearestKernel {
    fn sample(&self, src: &PixelBuffer, x: f64, y: f64, skip: Option<u32>, out: &mut [f64; 3]) -> bool {
        let ix = (snap(x) + 0.5).floor();
        let iy = (snap(y) + 0.5).floor();
        if !ix.is_finite() || !iy.is_finite() || !src.contains(ix as isize, iy as isize) {
            return false;
        }
        let (ix, iy) = (ix as usize, iy as usize);
        if is_skip(src, ix, iy, skip) {
            return false;
        }
        for (ch, o) in out.iter_mut().enumerate().take(src.format().channels()) {
            *o = src.sample(ix, iy, ch) as f64;
        }
        true
    }
}

pub(crate) struct BilinearKernel;

impl Kernel for BilinearKernel {
    fn sample(&self, src: &PixelBuffer, x: f64, y: f64, skip: Option<u32>, out: &mut [f64; 3]) -> bool {
        let (x, y) = (snap(x), snap(y));
        let (w, h) = (src.width(), src.height());
        if !(x >= 0.0 && y >= 0.0 && x <= (w - 1) as f64 && y <= (h - 1) as f64) {
            return false;
        }
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(w - 1);
        let y1 = (y0 + 1).min(h - 1);
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let corners = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)];
        if corners.iter().any(|&(cx, cy)| is_skip(src, cx, cy, skip)) {
            return false;
        }
        for (ch, o) in out.iter_mut().enumerate().take(src.format().channels()) {
            let top = src.sample(x0, y0, ch) as f64 * (1.0 - fx) + src.sample(x1, y0, ch) as f64 * fx;
            let bottom = src.sample(x0, y1, ch) as f64 * (1.0 - fx) + src.sample(x1, y1, ch) as f64 * fx;
            *o = top * (1.0 - fy) + bottom * fy;
        }
        true
    }
}

pub(crate) struct BicubicKernel;

/// Catmull-Rom interpolation between `p1` and `p2` at `t` in `[0, 1)`.
#[inline]
pub fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    p1 + 0.5
        * t
        * (p2 - p0
            + t * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3 + t * (3.0 * (p1 - p2) + p3 - p0)))
}

impl Kernel for BicubicKernel {
    fn sample(&self, src: &PixelBuffer, x: f64, y: f64, skip: Option<u32>, out: &mut [f64; 3]) -> bool {
        let (x, y) = (snap(x), snap(y));
        let fx0 = x.floor();
        let fy0 = y.floor();
        // Border pixels without a full 4x4 neighbourhood stay untouched.
        if !(fx0 >= 1.0
            && fy0 >= 1.0
            && fx0 + 2.0 <= (src.width() - 1) as f64
            && fy0 + 2.0 <= (src.height() - 1) as f64)
        {
            return false;
        }
        let (ix, iy) = (fx0 as usize, fy0 as usize);
        let (tx, ty) = (x - fx0, y - fy0);

        if skip.is_some() {
            for j in iy - 1..=iy + 2 {
                for i in ix - 1..=ix + 2 {
                    if is_skip(src, i, j, skip) {
                        return false;
                    }
                }
            }
        }

        let max = src.format().max_value() as f64;
        for (ch, o) in out.iter_mut().enumerate().take(src.format().channels()) {
            let mut rows = [0.0; 4];
            for (k, row) in rows.iter_mut().enumerate() {
                let j = iy + k - 1;
                *row = catmull_rom(
                    src.sample(ix - 1, j, ch) as f64,
                    src.sample(ix, j, ch) as f64,
                    src.sample(ix + 1, j, ch) as f64,
                    src.sample(ix + 2, j, ch) as f64,
                    tx,
                );
            }
            *o = catmull_rom(rows[0], rows[1], rows[2], rows[3], ty).clamp(0.0, max);
        }
        true
    }
}

/// How source channels are written into the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMap {
    Same,
    GrayToRgb,
    RgbToGray,
}

impl ChannelMap {
    pub fn select(source: PixelFormat, dest: PixelFormat) -> Result<Self> {
        match (source, dest) {
            (s, d) if s == d => Ok(Self::Same),
            (PixelFormat::Gray8, PixelFormat::Rgb8) => Ok(Self::GrayToRgb),
            (PixelFormat::Rgb8, PixelFormat::Gray8) => Ok(Self::RgbToGray),
            (s, d) => Err(AlignError::UnsupportedFormat(format!(
                "cannot warp {s} into {d}"
            ))),
        }
    }

    #[inline]
    pub(crate) fn write(self, dest: &mut PixelBuffer, x: usize, y: usize, values: &[f64; 3]) {
        let max = dest.format().max_value() as f64;
        let quantize = |v: f64| v.round().clamp(0.0, max) as u32;
        match self {
            Self::Same => {
                for (ch, &v) in values.iter().enumerate().take(dest.format().channels()) {
                    dest.set(x, y, ch, quantize(v));
                }
            }
            Self::GrayToRgb => {
                for ch in 0..3 {
                    dest.set(x, y, ch, quantize(values[0]));
                }
            }
            Self::RgbToGray => {
                let luma =
                    LUMINANCE_R * values[0] + LUMINANCE_G * values[1] + LUMINANCE_B * values[2];
                dest.set(x, y, 0, quantize(luma));
            }
        }
    }
}
