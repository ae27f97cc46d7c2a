//! Audible alerts.
//!
//! Playback itself sits behind [`AudioSink`]. [`AlertService`] decides what to
//! play: lifecycle clips whenever sound is on, violation clips only when the
//! debouncer lets them through. A sink that fails to play is logged and
//! otherwise ignored; an alert is never worth ending a run over.

use std::fmt;

use tracing::{debug, error, info};

use crate::core_modules::debouncer::ViolationDebouncer;
use crate::core_modules::frame::Face;
use crate::error::{Error, Result};

/// The clips the monitor can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertClip {
    MonitorStarted,
    MonitorStopped,
    ErrorOccurred,
    TemperatureViolation,
}

impl AlertClip {
    pub const ALL: [AlertClip; 4] = [
        AlertClip::MonitorStarted,
        AlertClip::MonitorStopped,
        AlertClip::ErrorOccurred,
        AlertClip::TemperatureViolation,
    ];

    /// File name of the clip inside the sounds directory.
    pub fn file_name(self) -> &'static str {
        match self {
            AlertClip::MonitorStarted => "monitor_started.mp3",
            AlertClip::MonitorStopped => "monitor_stopped.mp3",
            AlertClip::ErrorOccurred => "an_error_occurred_monitor_stopped.mp3",
            AlertClip::TemperatureViolation => "temperature_violation.mp3",
        }
    }
}

impl fmt::Display for AlertClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// An audio output able to play one clip at a time.
pub trait AudioSink: Send {
    fn init(&mut self) -> Result<()>;

    /// Starts playing `clip`, replacing whatever is playing.
    fn play(&mut self, clip: AlertClip) -> Result<()>;

    /// Whether a clip is still playing.
    fn is_busy(&self) -> bool;

    fn shutdown(&mut self);
}

/// A sink that plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn play(&mut self, clip: AlertClip) -> Result<()> {
        debug!(%clip, "silent sink, not playing");
        Ok(())
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn shutdown(&mut self) {}
}

pub struct AlertService {
    sink: Box<dyn AudioSink>,
    debouncer: ViolationDebouncer,
    sound_enabled: bool,
    initialized: bool,
}

impl AlertService {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            debouncer: ViolationDebouncer::default(),
            sound_enabled: false,
            initialized: false,
        }
    }

    /// Opens the sink and enables sound. A sink that fails to open leaves
    /// sound disabled.
    pub fn init(&mut self) {
        match self.sink.init() {
            Ok(()) => {
                self.initialized = true;
                self.sound_enabled = true;
                info!("audio sink initialised");
            }
            Err(e) => {
                self.sound_enabled = false;
                error!("failed to initialise audio sink, sound disabled: {e}");
            }
        }
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled && self.initialized;
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    /// Plays a start/stop/error clip. These are never debounced.
    pub fn lifecycle(&mut self, clip: AlertClip) {
        self.play(clip);
    }

    /// Decides from one frame's faces whether to sound the violation alert at
    /// time `t` (seconds), and plays it if so.
    pub fn evaluate(&mut self, faces: &[Face], t: f64) -> Result<bool> {
        if !t.is_finite() {
            return Err(Error::InvalidArgument(format!("alert time must be finite (got {t})")));
        }
        if self.debouncer.in_flight() && !self.sink.is_busy() {
            self.debouncer.playback_finished();
        }
        if !self.sound_enabled {
            return Ok(false);
        }
        let emit = self.debouncer.evaluate(faces, t);
        if emit {
            self.play(AlertClip::TemperatureViolation);
        }
        Ok(emit)
    }

    pub fn shutdown(&mut self) {
        if self.initialized {
            self.sink.shutdown();
            self.initialized = false;
            self.sound_enabled = false;
            debug!("audio sink shut down");
        }
    }

    fn play(&mut self, clip: AlertClip) {
        if !self.sound_enabled {
            return;
        }
        if let Err(e) = self.sink.play(clip) {
            error!("failed to play {clip}: {e}");
        }
    }
}

impl Drop for AlertService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
