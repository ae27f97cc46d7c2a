// THEORY:
// The `colorizer` turns a grid of raw sensor readings into something a person
// can look at. It is a two step, stateless transformation:
//
// 1.  **Rescale**: readings are stretched linearly so that the coldest pixel
//     becomes 0 and the hottest becomes 255, then truncated to 8 bits. The
//     stretch is relative to the frame itself, so the rendering always uses
//     the full palette no matter the absolute temperatures.
// 2.  **Palette lookup**: each 8-bit intensity indexes the selected palette's
//     lookup table, giving one RGB triple per pixel.
//
// A frame where every reading is identical has no range to stretch. Such a
// frame is rendered uniformly with the palette's middle entry.

use ndarray::{Array3, ArrayView2};
use tracing::debug;

use crate::core_modules::colormap::Colormap;
use crate::core_modules::frame::ColorFrame;
use crate::error::{Error, Result};

/// Palette entry used for frames without any temperature spread.
pub const CONSTANT_FRAME_LEVEL: u8 = u8::MAX / 2;

/// Rescales `raw` to 8 bits and maps it through the palette at `colormap_index`.
pub fn apply<'a>(raw: impl Into<ArrayView2<'a, f32>>, colormap_index: i32) -> Result<ColorFrame> {
    let raw = raw.into();
    let colormap = Colormap::from_index(colormap_index)?;
    let (height, width) = raw.dim();
    if raw.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "cannot colorize an empty {height}x{width} frame"
        )));
    }

    let lut = colormap.lut();
    let levels = rescale_to_u8(raw);

    let mut color = Array3::<u8>::zeros((height, width, 3));
    for ((row, col), level) in levels.indexed_iter() {
        let rgb = lut[*level as usize];
        for channel in 0..3 {
            color[[row, col, channel]] = rgb[channel];
        }
    }
    Ok(color)
}

/// Linear min/max stretch of a frame into `0..=255`.
pub fn rescale_to_u8(raw: ArrayView2<'_, f32>) -> ndarray::Array2<u8> {
    let min = raw.iter().copied().fold(f32::INFINITY, f32::min);
    let max = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;

    if !(span > 0.0) || !span.is_finite() {
        debug!(min, max, "frame has no usable temperature range, rendering uniformly");
        return raw.map(|_| CONSTANT_FRAME_LEVEL);
    }

    // `as u8` truncates and saturates, which is the behaviour wanted here.
    raw.map(|value| (255.0 * (value - min) / span) as u8)
}
