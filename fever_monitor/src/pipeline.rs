// THEORY:
// The `pipeline` module composes the core modules into the work done for one
// frame. The worker owns the loop; this module owns the stages. Keeping them
// apart means every stage can be exercised on a single frame without threads.
//
// Stages, in order:
// 1.  **Colorize** the raw readings with the configured palette.
// 2.  **Measure** every detection: crop a zoomed-out face region from the raw
//     readings, take its hottest value and compare it to the threshold.
// 3.  **Annotate** the color frame with boxes, captions and optionally the FPS.
// 4.  **Present** the annotated frame at the configured display width.

use tracing::trace;

use crate::config::Configuration;
use crate::core_modules::cropper::{DEFAULT_ZOOM_OUT, crop_face, max_value};
use crate::core_modules::frame::{ColorFrame, Detection, DisplayImage, Face, RawFrame};
use crate::core_modules::{colorizer, overlay, presenter};
use crate::detector::DetectorOutput;
use crate::error::{Error, Result};

/// Everything produced from one detector acquisition.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// The annotated frame at sensor resolution.
    pub color: ColorFrame,
    /// The annotated frame as handed to the consumer.
    pub image: DisplayImage,
    pub faces: Vec<Face>,
    pub fps: f32,
}

/// Per-run processing state: the class labels and their colors.
pub struct FramePipeline {
    labels: Vec<String>,
    palette: Vec<[u8; 3]>,
}

impl FramePipeline {
    pub fn new(labels: Vec<String>) -> Self {
        let palette = overlay::colors(labels.len());
        Self { labels, palette }
    }

    /// Swaps the label set, e.g. after the detector model changed.
    pub fn set_labels(&mut self, labels: Vec<String>) {
        self.palette = overlay::colors(labels.len());
        self.labels = labels;
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn process(&self, output: &DetectorOutput, config: &Configuration) -> Result<FrameReport> {
        // Stage 1: Colorize
        let mut color = colorizer::apply(&output.frame, config.colormap_index)?;

        // Stage 2: Temperature evaluation
        let faces = evaluate_faces(&output.frame, &output.detections, config.temp_threshold)?;

        // Stage 3: Annotation
        overlay::draw(&mut color, &output.detections, &self.palette, &self.labels)?;
        let fps = fps_from_elapsed(output.elapsed_ms);
        if config.show_fps {
            overlay::draw_fps(&mut color, fps)?;
        }

        // Stage 4: Presentation
        let image = presenter::present(&color, config.display_width)?;

        trace!(
            faces = faces.len(),
            violations = faces.iter().filter(|f| f.over_threshold).count(),
            fps,
            "frame processed"
        );

        Ok(FrameReport {
            color,
            image,
            faces,
            fps,
        })
    }
}

/// Measures every detection against the raw readings.
pub fn evaluate_faces(
    raw: &RawFrame,
    detections: &[Detection],
    temp_threshold: f32,
) -> Result<Vec<Face>> {
    detections
        .iter()
        .map(|detection| {
            let region = crop_face(raw, detection.bbox(), DEFAULT_ZOOM_OUT, DEFAULT_ZOOM_OUT)?;
            let measured_temperature = max_value(&region).ok_or_else(|| {
                Error::OutOfBounds(format!(
                    "face region around {:?} is empty after clamping",
                    detection.bbox()
                ))
            })?;
            Ok(Face {
                detection: detection.clone(),
                measured_temperature,
                over_threshold: measured_temperature >= temp_threshold,
            })
        })
        .collect()
}

/// Frame rate implied by one acquisition's latency.
pub fn fps_from_elapsed(elapsed_ms: f64) -> f32 {
    if elapsed_ms > 0.0 {
        (1000.0 / elapsed_ms) as f32
    } else {
        0.0
    }
}
