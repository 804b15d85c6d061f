use emalign_core::error::AlignError;
use emalign_core::pixel::{PixelBuffer, PixelFormat};

#[test]
fn test_new_rejects_zero_dimensions() {
    let err = PixelBuffer::new(0, 10, PixelFormat::Gray8).unwrap_err();
    assert!(matches!(
        err,
        AlignError::InvalidDimensions {
            width: 0,
            height: 10
        }
    ));
}

#[test]
fn test_from_raw_rejects_short_data() {
    let result = PixelBuffer::from_raw(4, 4, PixelFormat::Rgb8, vec![0; 47]);
    assert!(result.is_err());
}

#[test]
fn test_format_from_bytes_per_pixel() {
    assert_eq!(PixelFormat::from_bytes_per_pixel(1).unwrap(), PixelFormat::Gray8);
    assert_eq!(PixelFormat::from_bytes_per_pixel(2).unwrap(), PixelFormat::Gray16);
    assert_eq!(PixelFormat::from_bytes_per_pixel(3).unwrap(), PixelFormat::Rgb8);
    assert!(matches!(
        PixelFormat::from_bytes_per_pixel(4),
        Err(AlignError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_set_and_get_rgb() {
    let mut img = PixelBuffer::new(3, 2, PixelFormat::Rgb8).unwrap();
    img.set(2, 1, 0, 10);
    img.set(2, 1, 1, 20);
    img.set(2, 1, 2, 30);
    assert_eq!(img.get(2, 1, 1), Some(20));
    assert_eq!(img.get(2, 1, 3), None);
    assert_eq!(img.get(3, 1, 0), None);
    assert_eq!(img.stride(), 9);
}

#[test]
fn test_set_clamps_to_format_range() {
    let mut img = PixelBuffer::new(1, 1, PixelFormat::Gray8).unwrap();
    img.set(0, 0, 0, 1000);
    assert_eq!(img.sample(0, 0, 0), 255);
}

#[test]
fn test_luma_of_rgb() {
    let img = PixelBuffer::from_raw(1, 1, PixelFormat::Rgb8, vec![100, 200, 50]).unwrap();
    let expected = 0.299 * 100.0 + 0.587 * 200.0 + 0.114 * 50.0;
    assert!((img.luma(0, 0) - expected).abs() < 1e-9);
}

#[test]
fn test_invert_gray8() {
    let mut img = PixelBuffer::from_raw(2, 1, PixelFormat::Gray8, vec![0, 200]).unwrap();
    img.invert();
    assert_eq!(img.data(), &[255, 55]);
}

#[test]
fn test_to_gray8_stretches_16_bit() {
    let samples: [u16; 3] = [1000, 2000, 3000];
    let bytes: Vec<u8> = samples.iter().flat_map(|v| v.to_le_bytes()).collect();
    let img = PixelBuffer::from_raw(3, 1, PixelFormat::Gray16, bytes).unwrap();
    let gray = img.to_gray8();
    assert_eq!(gray.format(), PixelFormat::Gray8);
    assert_eq!(gray.data(), &[0, 128, 255]);
}

#[test]
fn test_to_gray8_keeps_transparent_value() {
    let img = PixelBuffer::new(2, 2, PixelFormat::Gray8)
        .unwrap()
        .with_transparent(Some(0));
    assert_eq!(img.to_gray8().transparent(), Some(0));
}
