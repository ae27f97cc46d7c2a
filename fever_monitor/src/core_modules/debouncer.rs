// THEORY:
// The `debouncer` keeps the violation alarm from turning into noise. A warm
// face stays in view for many consecutive frames; sounding the alarm on each
// of them would be useless. An alert is allowed only when:
//
// 1.  at least one face in the frame is over the threshold,
// 2.  no previously triggered alert is still playing, and
// 3.  more than `interval` seconds have passed since the last alert.
//
// Time is passed in by the caller as seconds on any monotonic clock, which
// keeps the policy deterministic under test.

use crate::core_modules::frame::Face;

/// Minimum number of seconds between two violation alerts.
pub const VIOLATION_INTERVAL_SECS: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct ViolationDebouncer {
    /// Time of the last emitted alert. `None` stands for "never".
    last_emit: Option<f64>,
    /// Set on emit, cleared once playback of that alert has finished.
    in_flight: bool,
    interval: f64,
}

impl Default for ViolationDebouncer {
    fn default() -> Self {
        Self::new(VIOLATION_INTERVAL_SECS)
    }
}

impl ViolationDebouncer {
    /// Creates a debouncer. Intervals shorter than the minimum are raised to it.
    pub fn new(interval: f64) -> Self {
        Self {
            last_emit: None,
            in_flight: false,
            interval: interval.max(VIOLATION_INTERVAL_SECS),
        }
    }

    /// Decides whether the faces seen at time `t` should trigger an alert,
    /// recording the emission when they do.
    pub fn evaluate(&mut self, faces: &[Face], t: f64) -> bool {
        let violation = faces.iter().any(|f| f.over_threshold);
        if !violation || self.in_flight {
            return false;
        }
        if let Some(last) = self.last_emit {
            if t - last <= self.interval {
                return false;
            }
        }
        self.last_emit = Some(t);
        self.in_flight = true;
        true
    }

    /// Marks the in-flight alert as finished playing.
    pub fn playback_finished(&mut self) {
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_emit(&self) -> Option<f64> {
        self.last_emit
    }
}
