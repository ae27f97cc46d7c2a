//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fever_monitor::{
    AlertClip, AudioSink, Configuration, Detection, Detector, DetectorError, DetectorFactory,
    DetectorOutput, DisplayImage, Error, EventHandler, EventReceiver, Face, RawFrame, Result,
    Severity, WorkerEvent,
};

pub const FRAME_HEIGHT: usize = 24;
pub const FRAME_WIDTH: usize = 32;
pub const AMBIENT: f32 = 31.0;
pub const FACE_TEMPERATURE: f32 = 39.5;

/// A 24x32 frame at ambient temperature with one warm 4x4 patch.
pub fn thermal_frame() -> RawFrame {
    let mut frame = RawFrame::from_elem((FRAME_HEIGHT, FRAME_WIDTH), AMBIENT);
    for r in 8..12 {
        for c in 10..14 {
            frame[[r, c]] = FACE_TEMPERATURE;
        }
    }
    frame
}

pub fn face_detection() -> Detection {
    Detection {
        class_id: 0,
        x: 10,
        y: 8,
        w: 4,
        h: 4,
        confidence: 0.91,
    }
}

/// Plays back the same frame until `fail_after` frames have been produced.
pub struct ScriptedDetector {
    model: String,
    labels: Vec<String>,
    produced: usize,
    fail_after: Option<usize>,
}

impl Detector for ScriptedDetector {
    fn run_once(
        &mut self,
        _config: &Configuration,
    ) -> std::result::Result<DetectorOutput, DetectorError> {
        if self.fail_after.is_some_and(|limit| self.produced >= limit) {
            return Err(DetectorError::Sensor("sensor disconnected".to_string()));
        }
        thread::sleep(Duration::from_millis(2));
        self.produced += 1;
        Ok(DetectorOutput {
            frame: thermal_frame(),
            detections: vec![face_detection()],
            elapsed_ms: 40.0,
        })
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Builds `ScriptedDetector`s and records which models were requested.
#[derive(Default)]
pub struct ScriptedFactory {
    pub fail_after: Option<usize>,
    /// Only the first detector built honours `fail_after`.
    pub fail_once: bool,
    pub refuse_to_load: bool,
    pub builds: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn failing_after(frames: usize) -> Self {
        Self {
            fail_after: Some(frames),
            ..Default::default()
        }
    }

    /// The first run fails after `frames` frames, later runs never fail.
    pub fn failing_once_after(frames: usize) -> Self {
        Self {
            fail_after: Some(frames),
            fail_once: true,
            ..Default::default()
        }
    }

    pub fn built_models(&self) -> Vec<String> {
        self.builds.lock().unwrap().clone()
    }
}

impl DetectorFactory for ScriptedFactory {
    fn create(
        &self,
        config: &Configuration,
    ) -> std::result::Result<Box<dyn Detector>, DetectorError> {
        if self.refuse_to_load {
            return Err(DetectorError::Load {
                model: config.model_name.clone(),
                reason: "no such file".to_string(),
            });
        }
        let mut builds = self.builds.lock().unwrap();
        let fail_after = if self.fail_once && !builds.is_empty() {
            None
        } else {
            self.fail_after
        };
        builds.push(config.model_name.clone());
        Ok(Box::new(ScriptedDetector {
            model: config.model_name.clone(),
            labels: vec!["face".to_string()],
            produced: 0,
            fail_after,
        }))
    }
}

/// Records every clip it is asked to play. Never busy, so only the time
/// window limits violation alerts.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub played: Arc<Mutex<Vec<AlertClip>>>,
    pub inits: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn clips(&self) -> Vec<AlertClip> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioSink for RecordingSink {
    fn init(&mut self) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn play(&mut self, clip: AlertClip) -> Result<()> {
        self.played.lock().unwrap().push(clip);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn shutdown(&mut self) {}
}

#[derive(Default)]
pub struct RecordingHandler {
    pub logs: Vec<(String, Severity)>,
    pub frames: Vec<(u32, u32, f32, Vec<Face>)>,
    pub errors: Vec<String>,
}

impl EventHandler for RecordingHandler {
    fn on_log(&mut self, text: &str, severity: Severity) {
        self.logs.push((text.to_string(), severity));
    }

    fn on_data(&mut self, image: &DisplayImage, fps: f32, faces: &[Face]) {
        let (width, height) = image.dimensions();
        self.frames.push((width, height, fps, faces.to_vec()));
    }

    fn on_error(&mut self, error: &Error) {
        self.errors.push(error.to_string());
    }
}

/// Polls `receiver` until an event matching `pred` arrives or `timeout`
/// passes. Events that do not match are discarded.
pub fn wait_for(
    receiver: &mut EventReceiver,
    timeout: Duration,
    mut pred: impl FnMut(&WorkerEvent) -> bool,
) -> Option<WorkerEvent> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match receiver.try_recv() {
            Some(event) if pred(&event) => return Some(event),
            Some(_) => {}
            None => thread::sleep(Duration::from_millis(1)),
        }
    }
    None
}

/// Polls `condition` until it holds or `timeout` passes.
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

pub const TIMEOUT: Duration = Duration::from_secs(5);
