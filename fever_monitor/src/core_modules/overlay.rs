// THEORY:
// The `overlay` module stamps detector output onto a color frame: a box around
// every detection and a `"label: confidence"` caption just above it.
//
// Key architectural principles:
// 1.  **Stable class colors**: each class id gets a color from a pseudo-random
//     sequence. The generator is a local instance seeded with the same value on
//     every call, so class 0 is the same color in every frame and every run.
// 2.  **Clipped drawing**: boxes and captions may extend past the frame edges.
//     Pixels that fall outside are skipped instead of failing the frame.
// 3.  **In-place**: drawing mutates the caller's frame and hands it back, so
//     the worker never copies a frame just to annotate it.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::core_modules::font::{GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH, glyph};
use crate::core_modules::frame::{ColorFrame, Detection};
use crate::error::{Error, Result};

/// Seed for the class color generator.
pub const PALETTE_SEED: u64 = 4;
/// Stroke width of detection boxes, in pixels.
pub const BOX_THICKNESS: i32 = 2;
/// Gap between the top of a box and the baseline of its caption.
pub const LABEL_OFFSET: i32 = 5;

const FPS_COLOR: [u8; 3] = [255, 255, 255];

/// Generates `n` RGB colors. Equal `n` always yields the same sequence.
pub fn colors(n: usize) -> Vec<[u8; 3]> {
    let mut rng = StdRng::seed_from_u64(PALETTE_SEED);
    (0..n)
        .map(|_| {
            [
                rng.gen_range(0..255u8),
                rng.gen_range(0..255u8),
                rng.gen_range(0..255u8),
            ]
        })
        .collect()
}

/// Draws a box and caption for every detection and returns the frame.
pub fn draw<'f, L: AsRef<str>>(
    frame: &'f mut ColorFrame,
    detections: &[Detection],
    colors: &[[u8; 3]],
    labels: &[L],
) -> Result<&'f mut ColorFrame> {
    check_channels(frame)?;

    for d in detections {
        let color = *colors.get(d.class_id).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "no color for class id {} ({} colors available)",
                d.class_id,
                colors.len()
            ))
        })?;
        let label = labels.get(d.class_id).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "no label for class id {} ({} labels available)",
                d.class_id,
                labels.len()
            ))
        })?;

        let (right, bottom) = (d.x.saturating_add(d.w), d.y.saturating_add(d.h));
        draw_rectangle(frame, d.x, d.y, right, bottom, color, BOX_THICKNESS);
        let text = format!("{}: {:.4}", label.as_ref(), d.confidence);
        draw_text(frame, d.x, d.y.saturating_sub(LABEL_OFFSET), &text, color);
    }

    Ok(frame)
}

/// Stamps the frame rate into the bottom-left corner.
pub fn draw_fps(frame: &mut ColorFrame, fps: f32) -> Result<()> {
    check_channels(frame)?;
    let height = frame.dim().0 as i32;
    draw_text(frame, 1, height - 2, &format!("FPS {fps:.1}"), FPS_COLOR);
    Ok(())
}

fn check_channels(frame: &ColorFrame) -> Result<()> {
    let channels = frame.dim().2;
    if channels != 3 {
        return Err(Error::InvalidArgument(format!(
            "expected a 3-channel frame but got {channels} channels"
        )));
    }
    Ok(())
}

fn put_pixel(frame: &mut ColorFrame, x: i32, y: i32, color: [u8; 3]) {
    let (height, width, _) = frame.dim();
    if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
        return;
    }
    let (row, col) = (y as usize, x as usize);
    for (channel, value) in color.iter().enumerate() {
        frame[[row, col, channel]] = *value;
    }
}

/// Outline from `(left, top)` to `(right, bottom)` inclusive, stroked inwards.
fn draw_rectangle(
    frame: &mut ColorFrame,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: [u8; 3],
    thickness: i32,
) {
    let (height, width, _) = frame.dim();
    let last_col = i32::try_from(width).unwrap_or(i32::MAX) - 1;
    let last_row = i32::try_from(height).unwrap_or(i32::MAX) - 1;
    for t in 0..thickness {
        let (l, r) = (left.saturating_add(t), right.saturating_sub(t));
        let (tp, b) = (top.saturating_add(t), bottom.saturating_sub(t));
        if l > r || tp > b {
            break;
        }
        // Only the visible part of each edge is walked.
        for x in l.max(0)..=r.min(last_col) {
            put_pixel(frame, x, tp, color);
            put_pixel(frame, x, b, color);
        }
        for y in tp.max(0)..=b.min(last_row) {
            put_pixel(frame, l, y, color);
            put_pixel(frame, r, y, color);
        }
    }
}

/// Renders `text` with its bottom row on `baseline`.
fn draw_text(frame: &mut ColorFrame, mut x: i32, baseline: i32, text: &str, color: [u8; 3]) {
    let top = baseline.saturating_sub(GLYPH_HEIGHT - 1);
    for ch in text.chars() {
        if let Some(rows) = glyph(ch) {
            for (row, pattern) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (pattern >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        let (px, py) = (x.saturating_add(col), top.saturating_add(row as i32));
                        put_pixel(frame, px, py, color);
                    }
                }
            }
        }
        x = x.saturating_add(GLYPH_ADVANCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn detection(class_id: usize, x: i32, y: i32, w: i32, h: i32) -> Detection {
        Detection {
            class_id,
            x,
            y,
            w,
            h,
            confidence: 0.87,
        }
    }

    fn pixel(frame: &ColorFrame, x: usize, y: usize) -> [u8; 3] {
        [frame[[y, x, 0]], frame[[y, x, 1]], frame[[y, x, 2]]]
    }

    #[test]
    fn colors_are_deterministic() {
        assert_eq!(colors(5), colors(5));
        assert_eq!(colors(0), Vec::<[u8; 3]>::new());
    }

    #[test]
    fn shorter_palettes_are_prefixes_of_longer_ones() {
        let long = colors(8);
        assert_eq!(&long[..3], colors(3).as_slice());
    }

    #[test]
    fn channel_values_stay_below_255() {
        assert!(colors(64).iter().flatten().all(|c| *c < 255));
    }

    #[test]
    fn boxes_are_drawn_with_a_two_pixel_stroke() {
        let mut frame = Array3::<u8>::zeros((40, 40, 3));
        let palette = vec![[10, 200, 30]];
        draw(&mut frame, &[detection(0, 10, 15, 12, 10)], &palette, &["face"]).unwrap();

        assert_eq!(pixel(&frame, 10, 15), [10, 200, 30]);
        assert_eq!(pixel(&frame, 11, 16), [10, 200, 30]);
        assert_eq!(pixel(&frame, 22, 25), [10, 200, 30]);
        assert_eq!(pixel(&frame, 21, 24), [10, 200, 30]);
        // the interior stays untouched
        assert_eq!(pixel(&frame, 16, 20), [0, 0, 0]);
    }

    #[test]
    fn captions_sit_above_the_box() {
        let mut frame = Array3::<u8>::zeros((40, 60, 3));
        let palette = vec![[255, 0, 0]];
        draw(&mut frame, &[detection(0, 2, 20, 10, 10)], &palette, &["face"]).unwrap();

        let baseline = 20 - LABEL_OFFSET;
        let caption_rows = (baseline - GLYPH_HEIGHT + 1) as usize..=baseline as usize;
        let stamped = caption_rows
            .flat_map(|y| (0..60).map(move |x| (x, y)))
            .any(|(x, y)| pixel(&frame, x, y) == [255, 0, 0]);
        assert!(stamped);
    }

    #[test]
    fn drawing_past_the_edges_is_clipped() {
        let mut frame = Array3::<u8>::zeros((10, 10, 3));
        let palette = colors(1);
        let result = draw(&mut frame, &[detection(0, -5, -5, 30, 30)], &palette, &["face"]);
        assert!(result.is_ok());
    }

    #[test]
    fn boxes_at_the_integer_limits_are_clipped() {
        let mut frame = Array3::<u8>::zeros((10, 10, 3));
        let palette = vec![[0, 255, 0]];
        let boxes = [
            detection(0, i32::MAX - 1, i32::MAX - 1, i32::MAX, i32::MAX),
            detection(0, i32::MIN, i32::MIN, 3, 3),
            detection(0, 0, 0, i32::MAX, i32::MAX),
        ];
        draw(&mut frame, &boxes, &palette, &["face"]).unwrap();
        // Only the last box reaches the frame: its top and left edges.
        assert_eq!(pixel(&frame, 5, 0), [0, 255, 0]);
        assert_eq!(pixel(&frame, 0, 5), [0, 255, 0]);
        assert_eq!(pixel(&frame, 5, 5), [0, 0, 0]);
    }

    #[test]
    fn unknown_class_ids_are_rejected() {
        let mut frame = Array3::<u8>::zeros((10, 10, 3));
        let palette = colors(1);
        let result = draw(&mut frame, &[detection(3, 1, 1, 2, 2)], &palette, &["face"]);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn fps_is_stamped_in_the_corner() {
        let mut frame = Array3::<u8>::zeros((24, 60, 3));
        draw_fps(&mut frame, 8.5).unwrap();
        let lit = frame.iter().any(|v| *v == 255);
        assert!(lit);
    }
}
