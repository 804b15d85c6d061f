use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};

use crate::error::{AlignError, Result};
use crate::pixel::{PixelBuffer, PixelFormat};

/// Decode an image file into a [`PixelBuffer`].
///
/// 8-bit and 16-bit grey keep their depth; anything with colour becomes
/// 8-bit RGB; alpha channels are dropped.
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path).map_err(|source| AlignError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let (w, h) = (img.width() as usize, img.height() as usize);

    match img {
        DynamicImage::ImageLuma8(gray) => PixelBuffer::from_raw(w, h, PixelFormat::Gray8, gray.into_raw()),
        DynamicImage::ImageLuma16(gray) => gray16_buffer(w, h, gray.as_raw()),
        DynamicImage::ImageRgb8(rgb) => PixelBuffer::from_raw(w, h, PixelFormat::Rgb8, rgb.into_raw()),
        other if other.color().has_color() => {
            PixelBuffer::from_raw(w, h, PixelFormat::Rgb8, other.to_rgb8().into_raw())
        }
        other if other.color().bytes_per_pixel() / other.color().channel_count() > 1 => {
            gray16_buffer(w, h, other.to_luma16().as_raw())
        }
        other => PixelBuffer::from_raw(w, h, PixelFormat::Gray8, other.to_luma8().into_raw()),
    }
}

fn gray16_buffer(w: usize, h: usize, samples: &[u16]) -> Result<PixelBuffer> {
    let mut bytes = vec![0u8; samples.len() * 2];
    LittleEndian::write_u16_into(samples, &mut bytes);
    PixelBuffer::from_raw(w, h, PixelFormat::Gray16, bytes)
}

/// Encode a [`PixelBuffer`]; the format follows the file extension.
pub fn save_image(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let (w, h) = (buffer.width() as u32, buffer.height() as u32);
    let bad_size = || AlignError::InvalidDimensions { width: w, height: h };
    let encode = |source| AlignError::Encode {
        path: path.to_path_buf(),
        source,
    };

    match buffer.format() {
        PixelFormat::Gray8 => {
            let img = GrayImage::from_raw(w, h, packed_samples(buffer).map(|v| v as u8).collect())
                .ok_or_else(bad_size)?;
            img.save(path).map_err(encode)
        }
        PixelFormat::Gray16 => {
            let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
                w,
                h,
                packed_samples(buffer).map(|v| v as u16).collect(),
            )
            .ok_or_else(bad_size)?;
            img.save(path).map_err(encode)
        }
        PixelFormat::Rgb8 => {
            let img = RgbImage::from_raw(w, h, packed_samples(buffer).map(|v| v as u8).collect())
                .ok_or_else(bad_size)?;
            img.save(path).map_err(encode)
        }
    }
}

/// Samples in row-major, channel-interleaved order without row padding.
fn packed_samples(buffer: &PixelBuffer) -> impl Iterator<Item = u32> + '_ {
    let channels = buffer.format().channels();
    (0..buffer.height()).flat_map(move |y| {
        (0..buffer.width())
            .flat_map(move |x| (0..channels).map(move |ch| buffer.sample(x, y, ch)))
    })
}
