use emalign_core::affine::{AffineMap, Point2};
use emalign_core::pixel::{PixelBuffer, PixelFormat};
use ndarray::Array2;

/// Small deterministic generator so test images never change.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

struct Blob {
    x: f64,
    y: f64,
    sigma: f64,
    amplitude: f64,
}

fn blobs(width: usize, height: usize, seed: u64) -> Vec<Blob> {
    let mut rng = Lcg::new(seed);
    let count = (width * height / 250).max(8);
    (0..count)
        .map(|_| {
            let sign = if rng.next_f64() < 0.5 { -1.0 } else { 1.0 };
            Blob {
                x: rng.range(-10.0, width as f64 + 10.0),
                y: rng.range(-10.0, height as f64 + 10.0),
                sigma: rng.range(2.5, 4.5),
                amplitude: sign * rng.range(40.0, 90.0),
            }
        })
        .collect()
}

/// Smooth random texture of gaussian blobs around grey level 128, with the
/// whole pattern moved by `(dx, dy)`: `f(x, y) = g(x - dx, y - dy)`.
pub fn blob_field(width: usize, height: usize, dx: f64, dy: f64, seed: u64) -> Array2<f32> {
    mapped_blob_field(width, height, seed, |x, y| (x - dx, y - dy))
}

/// The blob texture `g` read through `lookup`: `f(x, y) = g(lookup(x, y))`.
pub fn mapped_blob_field(
    width: usize,
    height: usize,
    seed: u64,
    lookup: impl Fn(f64, f64) -> (f64, f64),
) -> Array2<f32> {
    let blobs = blobs(width, height, seed);
    Array2::from_shape_fn((height, width), |(row, col)| {
        let (x, y) = lookup(col as f64, row as f64);
        let v: f64 = blobs
            .iter()
            .map(|b| {
                let r2 = (x - b.x).powi(2) + (y - b.y).powi(2);
                b.amplitude * (-r2 / (2.0 * b.sigma * b.sigma)).exp()
            })
            .sum();
        (128.0 + v) as f32
    })
}

pub fn blob_image(width: usize, height: usize, seed: u64) -> PixelBuffer {
    PixelBuffer::from_gray_array(&blob_field(width, height, 0.0, 0.0, seed)).unwrap()
}

pub fn shifted_blob_image(width: usize, height: usize, dx: f64, dy: f64, seed: u64) -> PixelBuffer {
    PixelBuffer::from_gray_array(&blob_field(width, height, dx, dy, seed)).unwrap()
}

/// Blob texture seen through `target_to_pattern`: the returned image at
/// `map(p)` shows what `blob_image` shows at `p`.
pub fn mapped_blob_image(width: usize, height: usize, seed: u64, target_to_pattern: &AffineMap) -> PixelBuffer {
    let back = target_to_pattern.inverse().unwrap();
    let field = mapped_blob_field(width, height, seed, |x, y| {
        let p = back.apply(Point2::new(x, y));
        (p.x, p.y)
    });
    PixelBuffer::from_gray_array(&field).unwrap()
}

/// `out(x, y) = img(x - dx, y - dy)` by bilinear interpolation, clamping at the borders.
pub fn shift_bilinear(img: &PixelBuffer, dx: f64, dy: f64) -> PixelBuffer {
    let (w, h) = (img.width(), img.height());
    let values = Array2::from_shape_fn((h, w), |(row, col)| {
        let x = (col as f64 - dx).clamp(0.0, (w - 1) as f64);
        let y = (row as f64 - dy).clamp(0.0, (h - 1) as f64);
        let (x0, y0) = (x.floor() as usize, y.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
        let (fx, fy) = (x - x0 as f64, y - y0 as f64);
        let top = img.luma(x0, y0) * (1.0 - fx) + img.luma(x1, y0) * fx;
        let bottom = img.luma(x0, y1) * (1.0 - fx) + img.luma(x1, y1) * fx;
        (top * (1.0 - fy) + bottom * fy) as f32
    });
    PixelBuffer::from_gray_array(&values).unwrap()
}

/// 8-bit image whose values are all distinct from their neighbours and never 0.
pub fn ramp_image(width: usize, height: usize) -> PixelBuffer {
    let mut img = PixelBuffer::new(width, height, PixelFormat::Gray8).unwrap();
    for y in 0..height {
        for x in 0..width {
            img.set(x, y, 0, ((x * 7 + y * 13) % 250 + 1) as u32);
        }
    }
    img
}

/// Blank canvas with every sample set to `value`.
pub fn canvas(width: usize, height: usize, value: u32) -> PixelBuffer {
    let mut img = PixelBuffer::new(width, height, PixelFormat::Gray8).unwrap();
    img.fill(value);
    img
}
