// THEORY:
// The `cropper` extracts rectangular regions from a frame. It works on the
// first two axes of any array, so the same code crops a raw `(h, w)` reading
// grid and a `(h, w, 3)` color frame.
//
// Key architectural principles:
// 1.  **Zero-copy**: a crop is a view into the source frame. Callers that need
//     ownership can call `to_owned()`.
// 2.  **Strict bounds**: `crop` requires `y + h < height` and `x + w < width`.
//     A rectangle flush with the far edge is rejected. Every rectangle built by
//     `face_region` respects the same rule, so a zoomed-out face crop always
//     succeeds for a box that starts inside the frame.
// 3.  **Shrink, never shift**: when zooming out pushes a face box past an edge,
//     the origin is clamped to 0 and the extent is trimmed. The box is not
//     slid back inside, so the zoom can end up asymmetric around the face.

use ndarray::{ArrayBase, ArrayView, Axis, Data, Dimension, Slice};

use crate::core_modules::frame::Rect;
use crate::error::{Error, Result};

/// Default fraction of the face box added on every side before cropping.
pub const DEFAULT_ZOOM_OUT: f32 = 0.33;

/// Returns a view of the `w x h` region whose top-left corner is `(x, y)`.
pub fn crop<A, S, D>(
    frame: &ArrayBase<S, D>,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
) -> Result<ArrayView<'_, A, D>>
where
    S: Data<Elem = A>,
    D: Dimension,
{
    if frame.ndim() < 2 {
        return Err(Error::InvalidArgument(format!(
            "cannot crop a {}-dimensional array",
            frame.ndim()
        )));
    }
    let height = frame.len_of(Axis(0)) as i64;
    let width = frame.len_of(Axis(1)) as i64;
    let (x, y, w, h) = (x as i64, y as i64, w as i64, h as i64);

    if y < 0 || h < 0 || y + h >= height {
        return Err(Error::OutOfBounds(format!(
            "y crop index outside bounds of the array (y={y}, h={h}, height={height})"
        )));
    }
    if x < 0 || w < 0 || x + w >= width {
        return Err(Error::OutOfBounds(format!(
            "x crop index outside bounds of the array (x={x}, w={w}, width={width})"
        )));
    }

    let rows = Slice::from(y as usize..(y + h) as usize);
    let cols = Slice::from(x as usize..(x + w) as usize);
    Ok(frame
        .view()
        .slice_axis_move(Axis(0), rows)
        .slice_axis_move(Axis(1), cols))
}

/// Computes the zoomed-out, edge-clamped rectangle used to crop a face.
pub fn face_region(
    frame_height: usize,
    frame_width: usize,
    bbox: Rect,
    x_zoom_out: f32,
    y_zoom_out: f32,
) -> Rect {
    let x_zoom = (bbox.w as f32 * x_zoom_out).ceil() as i32;
    let y_zoom = (bbox.h as f32 * y_zoom_out).ceil() as i32;

    let mut x = bbox.x.saturating_sub(x_zoom);
    let mut y = bbox.y.saturating_sub(y_zoom);
    let mut w = bbox.w.saturating_add(x_zoom.saturating_mul(2));
    let mut h = bbox.h.saturating_add(y_zoom.saturating_mul(2));

    let height = i32::try_from(frame_height).unwrap_or(i32::MAX);
    let width = i32::try_from(frame_width).unwrap_or(i32::MAX);
    if y < 0 {
        y = 0;
    }
    if x < 0 {
        x = 0;
    }
    if height <= y.saturating_add(h) {
        h = height - y - 1;
    }
    if width <= x.saturating_add(w) {
        w = width - x - 1;
    }

    Rect::new(x, y, w, h)
}

/// Crops a face with some surrounding context, clamped to the frame.
pub fn crop_face<A, S, D>(
    frame: &ArrayBase<S, D>,
    bbox: Rect,
    x_zoom_out: f32,
    y_zoom_out: f32,
) -> Result<ArrayView<'_, A, D>>
where
    S: Data<Elem = A>,
    D: Dimension,
{
    if frame.ndim() < 2 {
        return Err(Error::InvalidArgument(format!(
            "cannot crop a {}-dimensional array",
            frame.ndim()
        )));
    }
    let region = face_region(
        frame.len_of(Axis(0)),
        frame.len_of(Axis(1)),
        bbox,
        x_zoom_out,
        y_zoom_out,
    );
    crop(frame, region.x, region.y, region.w, region.h)
}

/// Hottest reading in a region, or `None` when the region is empty.
pub fn max_value<S, D>(region: &ArrayBase<S, D>) -> Option<f32>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    region.iter().copied().reduce(f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn crop_returns_height_width_channels() {
        let frame = Array3::<u8>::zeros((24, 32, 3));
        let region = crop(&frame, 4, 2, 10, 6).unwrap();
        assert_eq!(region.dim(), (6, 10, 3));
    }

    #[test]
    fn crop_reads_the_right_pixels() {
        let frame = Array2::from_shape_fn((5, 6), |(r, c)| (r * 10 + c) as f32);
        let region = crop(&frame, 2, 1, 3, 2).unwrap();
        assert_eq!(region[[0, 0]], 12.0);
        assert_eq!(region[[1, 2]], 24.0);
    }

    #[test]
    fn crop_rejects_negative_origins() {
        let frame = Array2::<f32>::zeros((10, 10));
        assert!(matches!(crop(&frame, -1, 0, 2, 2), Err(Error::OutOfBounds(_))));
        assert!(matches!(crop(&frame, 0, -1, 2, 2), Err(Error::OutOfBounds(_))));
    }

    #[test]
    fn crop_rejects_rectangles_flush_with_the_far_edge() {
        let frame = Array2::<f32>::zeros((10, 12));
        assert!(crop(&frame, 0, 0, 11, 9).is_ok());
        assert!(matches!(crop(&frame, 0, 0, 12, 5), Err(Error::OutOfBounds(_))));
        assert!(matches!(crop(&frame, 0, 0, 5, 10), Err(Error::OutOfBounds(_))));
    }

    #[test]
    fn face_region_zooms_out_by_the_rounded_up_fraction() {
        let region = face_region(100, 100, Rect::new(40, 40, 10, 20), 0.33, 0.33);
        // ceil(10 * 0.33) = 4, ceil(20 * 0.33) = 7
        assert_eq!(region, Rect::new(36, 33, 18, 34));
    }

    #[test]
    fn face_region_clamps_origin_without_shrinking_extent() {
        let region = face_region(100, 100, Rect::new(1, 2, 10, 10), 0.33, 0.33);
        assert_eq!(region, Rect::new(0, 0, 18, 18));
    }

    #[test]
    fn face_region_shrinks_at_the_far_edge() {
        let region = face_region(24, 32, Rect::new(25, 18, 6, 5), 0.33, 0.33);
        assert_eq!(region.x, 23);
        assert_eq!(region.y, 16);
        assert_eq!(region.x + region.w, 31);
        assert_eq!(region.y + region.h, 23);
    }

    #[test]
    fn face_crops_always_stay_inside_the_frame() {
        let frame = Array2::<f32>::zeros((24, 32));
        for y in 0..24 {
            for x in 0..32 {
                for (w, h) in [(1, 1), (4, 6), (10, 10), (31 - x, 23 - y)] {
                    let bbox = Rect::new(x, y, w, h);
                    let region = face_region(24, 32, bbox, DEFAULT_ZOOM_OUT, DEFAULT_ZOOM_OUT);
                    assert!(region.x >= 0 && region.y >= 0);
                    assert!(region.x + region.w < 32);
                    assert!(region.y + region.h < 24);
                    assert!(crop_face(&frame, bbox, DEFAULT_ZOOM_OUT, DEFAULT_ZOOM_OUT).is_ok());
                }
            }
        }
    }

    #[test]
    fn extreme_boxes_do_not_overflow() {
        let frame = Array2::<f32>::zeros((24, 32));
        let huge = Rect::new(i32::MAX - 1, i32::MAX - 1, i32::MAX, i32::MAX);
        assert!(crop_face(&frame, huge, DEFAULT_ZOOM_OUT, DEFAULT_ZOOM_OUT).is_err());

        let wide = Rect::new(i32::MIN, 2, i32::MAX, 4);
        let region = crop_face(&frame, wide, DEFAULT_ZOOM_OUT, DEFAULT_ZOOM_OUT).unwrap();
        assert_eq!(region.dim().1, 31);
    }

    #[test]
    fn max_value_finds_the_hottest_reading() {
        let frame = Array2::from_shape_fn((4, 4), |(r, c)| 30.0 + (r + c) as f32);
        let region = crop(&frame, 0, 0, 3, 3).unwrap();
        assert_eq!(max_value(&region), Some(34.0));
        let empty = crop(&frame, 1, 1, 0, 0).unwrap();
        assert_eq!(max_value(&empty), None);
    }
}
