//! The seam between the monitor and whatever produces thermal frames and face
//! boxes.
//!
//! Model loading, sensor access and inference live behind these traits. The
//! worker only needs one frame, its detections and how long that took.

use thiserror::Error;

use crate::config::Configuration;
use crate::core_modules::frame::{Detection, RawFrame};

/// Failures reported by a detector collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// The model or its weights could not be loaded.
    #[error("failed to load model '{model}': {reason}")]
    Load { model: String, reason: String },

    /// The sensor did not deliver a frame.
    #[error("sensor read failed: {0}")]
    Sensor(String),

    /// The model failed while running on a frame.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// One acquisition: the raw readings, what was found in them and how long it took.
#[derive(Debug, Clone)]
pub struct DetectorOutput {
    pub frame: RawFrame,
    pub detections: Vec<Detection>,
    /// Wall time spent acquiring and running inference, in milliseconds.
    pub elapsed_ms: f64,
}

/// Produces frames and detections, one call per loop iteration.
pub trait Detector: Send {
    /// Reads a frame and runs the model on it. Blocking.
    fn run_once(&mut self, config: &Configuration) -> Result<DetectorOutput, DetectorError>;

    /// Class names, indexed by `Detection::class_id`.
    fn labels(&self) -> &[String];

    /// The model this detector was built for.
    fn model_name(&self) -> &str;
}

/// Builds detectors. Called once on start and again whenever the configured
/// model changes.
pub trait DetectorFactory: Send + Sync {
    fn create(&self, config: &Configuration) -> Result<Box<dyn Detector>, DetectorError>;
}

impl<F> DetectorFactory for F
where
    F: Fn(&Configuration) -> Result<Box<dyn Detector>, DetectorError> + Send + Sync,
{
    fn create(&self, config: &Configuration) -> Result<Box<dyn Detector>, DetectorError> {
        self(config)
    }
}
