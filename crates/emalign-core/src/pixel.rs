use byteorder::{ByteOrder, LittleEndian};
use ndarray::Array2;

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::error::{AlignError, Result};

/// Sample layout of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// One 8-bit grey sample per pixel.
    Gray8,
    /// One 16-bit little-endian grey sample per pixel.
    Gray16,
    /// Three 8-bit samples per pixel (R, G, B).
    Rgb8,
}

impl PixelFormat {
    pub fn from_bytes_per_pixel(bytes: usize) -> Result<Self> {
        match bytes {
            1 => Ok(Self::Gray8),
            2 => Ok(Self::Gray16),
            3 => Ok(Self::Rgb8),
            n => Err(AlignError::UnsupportedFormat(format!(
                "{n} bytes per pixel"
            ))),
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Gray16 => 2,
            Self::Rgb8 => 3,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Gray8 | Self::Gray16 => 1,
            Self::Rgb8 => 3,
        }
    }

    /// Largest representable sample value.
    pub fn max_value(self) -> u32 {
        match self {
            Self::Gray16 => u16::MAX as u32,
            Self::Gray8 | Self::Rgb8 => u8::MAX as u32,
        }
    }

    /// Bytes used by a single channel sample.
    pub fn sample_bytes(self) -> usize {
        self.bytes_per_pixel() / self.channels()
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gray8 => write!(f, "8-bit grey"),
            Self::Gray16 => write!(f, "16-bit grey"),
            Self::Rgb8 => write!(f, "8-bit RGB"),
        }
    }
}

/// A row-major image with 1, 2 or 3 bytes per pixel.
///
/// Rows may be padded: `stride` is the distance in bytes between the starts
/// of consecutive rows and is at least `width * bytes_per_pixel`.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    format: PixelFormat,
    stride: usize,
    data: Vec<u8>,
    /// Sample value treated as "no data" by the warp rasterizer.
    transparent: Option<u32>,
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer.
    pub fn new(width: usize, height: usize, format: PixelFormat) -> Result<Self> {
        check_dimensions(width, height)?;
        let stride = width * format.bytes_per_pixel();
        Ok(Self {
            width,
            height,
            format,
            stride,
            data: vec![0; stride * height],
            transparent: None,
        })
    }

    /// Wrap tightly packed sample bytes.
    pub fn from_raw(width: usize, height: usize, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let stride = width * format.bytes_per_pixel();
        Self::from_raw_with_stride(width, height, format, stride, data)
    }

    /// Wrap sample bytes whose rows are `stride` bytes apart.
    pub fn from_raw_with_stride(
        width: usize,
        height: usize,
        format: PixelFormat,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self> {
        check_dimensions(width, height)?;
        let row_bytes = width * format.bytes_per_pixel();
        if stride < row_bytes {
            return Err(AlignError::InvalidConfig(format!(
                "row stride {stride} is shorter than a row of {row_bytes} bytes"
            )));
        }
        let needed = stride * (height - 1) + row_bytes;
        if data.len() < needed {
            return Err(AlignError::InvalidConfig(format!(
                "pixel data holds {} bytes, {needed} needed for {width}x{height} {format}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            stride,
            data,
            transparent: None,
        })
    }

    /// Build an 8-bit grey buffer from floating point samples (rounded, clamped to 0..=255).
    pub fn from_gray_array(values: &Array2<f32>) -> Result<Self> {
        let (h, w) = values.dim();
        let mut buf = Self::new(w, h, PixelFormat::Gray8)?;
        for ((row, col), &v) in values.indexed_iter() {
            buf.data[row * buf.stride + col] = v.round().clamp(0.0, 255.0) as u8;
        }
        Ok(buf)
    }

    pub fn with_transparent(mut self, value: Option<u32>) -> Self {
        self.transparent = value;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn transparent(&self) -> Option<u32> {
        self.transparent
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn offset(&self, x: usize, y: usize, channel: usize) -> usize {
        y * self.stride + x * self.format.bytes_per_pixel() + channel * self.format.sample_bytes()
    }

    /// Sample at integer coordinates, `None` outside the image.
    pub fn get(&self, x: usize, y: usize, channel: usize) -> Option<u32> {
        if x >= self.width || y >= self.height || channel >= self.format.channels() {
            return None;
        }
        Some(self.sample(x, y, channel))
    }

    /// Sample at integer coordinates. Panics when out of bounds.
    #[inline]
    pub fn sample(&self, x: usize, y: usize, channel: usize) -> u32 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let o = self.offset(x, y, channel);
        match self.format {
            PixelFormat::Gray16 => LittleEndian::read_u16(&self.data[o..o + 2]) as u32,
            PixelFormat::Gray8 | PixelFormat::Rgb8 => self.data[o] as u32,
        }
    }

    /// Write a sample, clamped to the format's range. Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: u32) {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        let o = self.offset(x, y, channel);
        let value = value.min(self.format.max_value());
        match self.format {
            PixelFormat::Gray16 => LittleEndian::write_u16(&mut self.data[o..o + 2], value as u16),
            PixelFormat::Gray8 | PixelFormat::Rgb8 => self.data[o] = value as u8,
        }
    }

    /// Grey level at integer coordinates (BT.601 luma for RGB).
    pub fn luma(&self, x: usize, y: usize) -> f64 {
        match self.format {
            PixelFormat::Gray8 | PixelFormat::Gray16 => self.sample(x, y, 0) as f64,
            PixelFormat::Rgb8 => {
                LUMINANCE_R * self.sample(x, y, 0) as f64
                    + LUMINANCE_G * self.sample(x, y, 1) as f64
                    + LUMINANCE_B * self.sample(x, y, 2) as f64
            }
        }
    }

    /// Set every channel of every pixel to `value`.
    pub fn fill(&mut self, value: u32) {
        for y in 0..self.height {
            for x in 0..self.width {
                for ch in 0..self.format.channels() {
                    self.set(x, y, ch, value);
                }
            }
        }
    }

    /// Reverse contrast in place (`max - v`).
    pub fn invert(&mut self) {
        let max = self.format.max_value();
        for y in 0..self.height {
            for x in 0..self.width {
                for ch in 0..self.format.channels() {
                    let v = self.sample(x, y, ch);
                    self.set(x, y, ch, max - v);
                }
            }
        }
    }

    /// Convert to 8-bit grey.
    ///
    /// 16-bit data is stretched so that its minimum maps to 0 and its
    /// maximum to 255; RGB is reduced to luma.
    pub fn to_gray8(&self) -> PixelBuffer {
        let mut out = PixelBuffer {
            width: self.width,
            height: self.height,
            format: PixelFormat::Gray8,
            stride: self.width,
            data: vec![0; self.width * self.height],
            transparent: None,
        };
        match self.format {
            PixelFormat::Gray8 => {
                for y in 0..self.height {
                    for x in 0..self.width {
                        out.data[y * self.width + x] = self.sample(x, y, 0) as u8;
                    }
                }
                out.transparent = self.transparent;
            }
            PixelFormat::Gray16 => {
                let (mut lo, mut hi) = (u32::MAX, 0u32);
                for y in 0..self.height {
                    for x in 0..self.width {
                        let v = self.sample(x, y, 0);
                        lo = lo.min(v);
                        hi = hi.max(v);
                    }
                }
                let range = (hi - lo).max(1) as f64;
                for y in 0..self.height {
                    for x in 0..self.width {
                        let v = (self.sample(x, y, 0) - lo) as f64 * 255.0 / range;
                        out.data[y * self.width + x] = v.round() as u8;
                    }
                }
            }
            PixelFormat::Rgb8 => {
                for y in 0..self.height {
                    for x in 0..self.width {
                        out.data[y * self.width + x] = self.luma(x, y).round().clamp(0.0, 255.0) as u8;
                    }
                }
            }
        }
        out
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 || width > u32::MAX as usize || height > u32::MAX as usize {
        return Err(AlignError::InvalidDimensions {
            width: width.min(u32::MAX as usize) as u32,
            height: height.min(u32::MAX as usize) as u32,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray16_samples_are_little_endian() {
        let buf = PixelBuffer::from_raw(2, 1, PixelFormat::Gray16, vec![0x34, 0x12, 0xff, 0x00])
            .unwrap();
        assert_eq!(buf.sample(0, 0, 0), 0x1234);
        assert_eq!(buf.sample(1, 0, 0), 0x00ff);
    }

    #[test]
    fn test_padded_stride_offsets() {
        let data = vec![1, 2, 0, 0, 3, 4, 0, 0];
        let buf = PixelBuffer::from_raw_with_stride(2, 2, PixelFormat::Gray8, 4, data).unwrap();
        assert_eq!(buf.sample(1, 1, 0), 4);
        assert_eq!(buf.get(2, 0, 0), None);
    }
}
