//! Converts color frames into displayable images.

use image::{RgbImage, imageops::FilterType};

use crate::core_modules::frame::{ColorFrame, DisplayImage};
use crate::error::{Error, Result};

/// Wraps `frame` as an image, optionally scaled to `width` pixels wide with the
/// aspect ratio preserved.
pub fn present(frame: &ColorFrame, width: Option<i32>) -> Result<DisplayImage> {
    if let Some(w) = width {
        if w <= 0 {
            return Err(Error::InvalidArgument(format!(
                "Width value must be greater than 0 (got {w})."
            )));
        }
    }

    let (height, natural_width, channels) = frame.dim();
    if channels != 3 {
        return Err(Error::InvalidArgument(format!(
            "expected a 3-channel frame but got {channels} channels"
        )));
    }

    // Logical iteration order is row-major regardless of the frame's memory layout.
    let buffer: Vec<u8> = frame.iter().copied().collect();
    let image = RgbImage::from_raw(natural_width as u32, height as u32, buffer).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "frame of {natural_width}x{height} does not fit an RGB image buffer"
        ))
    })?;

    match width {
        Some(w) if w as u32 != image.width() => Ok(scale_to_width(&image, w as u32)),
        _ => Ok(image),
    }
}

/// Resizes an image to `width`, keeping its aspect ratio.
pub fn scale_to_width(image: &RgbImage, width: u32) -> RgbImage {
    let aspect_ratio = image.height() as f64 / image.width().max(1) as f64;
    let height = ((width as f64 * aspect_ratio).round() as u32).max(1);
    image::imageops::resize(image, width, height, FilterType::CatmullRom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn natural_width_is_kept_without_a_target() {
        let frame = Array3::<u8>::zeros((24, 32, 3));
        let image = present(&frame, None).unwrap();
        assert_eq!(image.dimensions(), (32, 24));
    }

    #[test]
    fn scaling_preserves_aspect_ratio() {
        let frame = Array3::<u8>::zeros((24, 32, 3));
        let image = present(&frame, Some(320)).unwrap();
        assert_eq!(image.dimensions(), (320, 240));
    }

    #[test]
    fn non_positive_widths_are_rejected() {
        let frame = Array3::<u8>::zeros((2, 2, 3));
        assert!(matches!(present(&frame, Some(0)), Err(Error::InvalidArgument(_))));
        assert!(matches!(present(&frame, Some(-5)), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn pixel_layout_follows_rows_then_columns() {
        let mut frame = Array3::<u8>::zeros((2, 3, 3));
        frame[[1, 2, 0]] = 200;
        frame[[0, 1, 2]] = 50;
        let image = present(&frame, None).unwrap();
        assert_eq!(image.get_pixel(2, 1).0, [200, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 0, 50]);
    }
}
