// THEORY:
// The `frame` module holds the plain data carried between the stages of the
// thermal pipeline. Like the pixel and chunk containers of a classic vision
// engine, these types are "dumb": they know their own shape and nothing about
// how they are produced or consumed.
//
// Key architectural principles:
// 1.  **Raw vs. Color**: A `RawFrame` is a grid of sensor readings in the
//     configured temperature unit. A `ColorFrame` is the 8-bit RGB rendering of
//     that grid and always shares its spatial dimensions.
// 2.  **Detections are pixel boxes**: A `Detection` is whatever the detector
//     reports. A `Face` is a detection that has been measured against the raw
//     readings and judged against the temperature threshold.

use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 2D grid of sensor readings, indexed `[row, column]`.
pub type RawFrame = Array2<f32>;

/// An 8-bit RGB rendering of a `RawFrame`, shaped `(height, width, 3)`.
pub type ColorFrame = Array3<u8>;

/// The image handed to the consumer for display.
pub type DisplayImage = image::RgbImage;

/// Converts a `(height, width, 1)` single-channel capture into a `RawFrame`.
pub fn squeeze_single_channel(frame: Array3<f32>) -> Result<RawFrame> {
    let channels = frame.len_of(Axis(2));
    if channels != 1 {
        return Err(Error::InvalidArgument(format!(
            "expected a single-channel frame but got {channels} channels"
        )));
    }
    Ok(frame.index_axis_move(Axis(2), 0))
}

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// A single box reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index into the detector's label list.
    pub class_id: usize,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    pub fn bbox(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// A detection whose temperature has been measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub detection: Detection,
    /// Hottest reading inside the zoomed-out face region.
    pub measured_temperature: f32,
    /// `measured_temperature >= temp_threshold` at the time of measurement.
    pub over_threshold: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squeeze_drops_the_channel_axis() {
        let frame = Array3::<f32>::from_elem((24, 32, 1), 30.0);
        let raw = squeeze_single_channel(frame).unwrap();
        assert_eq!(raw.dim(), (24, 32));
    }

    #[test]
    fn squeeze_rejects_multi_channel_frames() {
        let frame = Array3::<f32>::zeros((4, 4, 3));
        assert!(matches!(
            squeeze_single_channel(frame),
            Err(Error::InvalidArgument(_))
        ));
    }
}
