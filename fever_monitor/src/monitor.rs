// THEORY:
// The `Monitor` is the foreground half of the system. It plays the part a main
// window would: it starts and stops the worker, keeps the current
// configuration, turns worker events into handler callbacks and decides when
// to sound an alert. It never blocks on the worker; events are pulled with
// `pump` (or awaited with `dispatch_next`) on the caller's own schedule.
//
// Key architectural principles:
// 1.  **Single consumer**: the monitor is the only reader of the event queue,
//     so callbacks run on the caller's thread in emission order.
// 2.  **Alerts follow events**: violation alerts are evaluated when a frame is
//     dispatched, not when it is produced, so a muted or slow consumer never
//     holds up the worker.
// 3.  **Errors reset the run**: an `ErrorEvent` ends the worker's loop. The
//     monitor plays the error clip, reports it and joins the finished thread so
//     a new `start` is accepted straight away.
// 4.  **Only the live run is heard**: frames and errors carry the run that
//     produced them. Once `stop` returns, or a failure has been handled, events
//     still queued from that run are discarded instead of dispatched.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::alerts::{AlertClip, AlertService, AudioSink};
use crate::config::Configuration;
use crate::core_modules::frame::{DisplayImage, Face};
use crate::detector::DetectorFactory;
use crate::error::{Error, Result};
use crate::events::{EVENT_QUEUE_CAPACITY, EventReceiver, Severity, WorkerEvent};
use crate::worker::{WorkerController, WorkerState};

/// Receives what the worker reports, on the thread that pumps the monitor.
pub trait EventHandler {
    fn on_log(&mut self, text: &str, severity: Severity);

    fn on_data(&mut self, image: &DisplayImage, fps: f32, faces: &[Face]);

    /// The run has ended with `error`. The monitor is idle again when this is
    /// called.
    fn on_error(&mut self, error: &Error);
}

pub struct Monitor<H: EventHandler> {
    worker: WorkerController,
    events: EventReceiver,
    alerts: AlertService,
    handler: H,
    config: Configuration,
    clock: Instant,
    /// Fps of the last dispatched frame, zero while idle.
    fps: f32,
    /// Run whose frames and errors are dispatched. `None` while idle.
    accepting: Option<u64>,
}

impl<H: EventHandler> Monitor<H> {
    pub fn new(factory: Arc<dyn DetectorFactory>, sink: Box<dyn AudioSink>, handler: H) -> Self {
        let (worker, events) = WorkerController::split(factory, EVENT_QUEUE_CAPACITY);
        let mut alerts = AlertService::new(sink);
        alerts.init();
        Self {
            worker,
            events,
            alerts,
            handler,
            config: Configuration::default(),
            clock: Instant::now(),
            fps: 0.0,
            accepting: None,
        }
    }

    pub fn start(&mut self, config: Configuration) -> Result<()> {
        debug!("initialising worker thread");
        if let Err(e) = self.worker.start(config.clone()) {
            self.handler
                .on_log(&format!("Failed to initialise worker thread: {e}"), Severity::Error);
            return Err(e);
        }
        info!("started worker thread");
        self.accepting = Some(self.worker.current_run());
        self.alerts.set_sound_enabled(config.sound_enabled);
        self.config = config;
        self.alerts.lifecycle(AlertClip::MonitorStarted);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.worker.stop()?;
        self.accepting = None;
        self.discard_pending();
        self.fps = 0.0;
        self.alerts.lifecycle(AlertClip::MonitorStopped);
        info!("stopped worker thread");
        Ok(())
    }

    /// Stores `config` and, if a run is active, hands it to the worker.
    pub fn change_configuration(&mut self, config: Configuration) -> Result<()> {
        config.validate()?;
        if self.worker.state() == WorkerState::Running {
            if let Err(e) = self.worker.change_configuration(config.clone()) {
                self.handler.on_log(
                    &format!("Failed to set worker thread runtime configuration: {e}"),
                    Severity::Error,
                );
                return Err(e);
            }
        }
        self.alerts.set_sound_enabled(config.sound_enabled);
        self.config = config;
        Ok(())
    }

    /// Dispatches every event that is ready, stamping alerts with the time
    /// since the monitor was created. Returns the number of events handled.
    pub fn pump(&mut self) -> usize {
        let t = self.clock.elapsed().as_secs_f64();
        self.pump_at(t)
    }

    /// Like [`pump`](Self::pump) with an explicit alert time in seconds.
    pub fn pump_at(&mut self, t: f64) -> usize {
        let pending = self.events.drain();
        let count = pending.len();
        for event in pending {
            self.dispatch(event, t);
        }
        count
    }

    /// Waits for the next event and dispatches it. Returns `false` once the
    /// queue has closed.
    pub async fn dispatch_next(&mut self) -> bool {
        match self.events.recv().await {
            Some(event) => {
                let t = self.clock.elapsed().as_secs_f64();
                self.dispatch(event, t);
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn dropped_frames(&self) -> u64 {
        self.worker.dropped_frames()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Empties the queue. Log lines are still delivered; frames and errors
    /// from runs that are over are dropped.
    fn discard_pending(&mut self) {
        let mut discarded = 0;
        for event in self.events.drain() {
            match event {
                WorkerEvent::Log(log) => self.handler.on_log(&log.text, log.severity),
                WorkerEvent::Data(_) | WorkerEvent::Error(_) => discarded += 1,
            }
        }
        if discarded > 0 {
            debug!(discarded, "discarded events from a finished run");
        }
    }

    fn dispatch(&mut self, event: WorkerEvent, t: f64) {
        match event {
            WorkerEvent::Log(log) => self.handler.on_log(&log.text, log.severity),
            WorkerEvent::Data(data) if self.accepting != Some(data.run) => {
                debug!(
                    run = data.run,
                    frame = data.frame_number,
                    "ignoring frame from a finished run"
                );
            }
            WorkerEvent::Error(failure) if self.accepting != Some(failure.run) => {
                debug!(
                    run = failure.run,
                    "ignoring failure from a finished run: {}",
                    failure.error
                );
            }
            WorkerEvent::Data(data) => {
                self.fps = data.fps;
                if let Err(e) = self.alerts.evaluate(&data.faces, t) {
                    warn!("violation alert skipped: {e}");
                }
                self.handler.on_data(&data.image, data.fps, &data.faces);
            }
            WorkerEvent::Error(failure) => {
                self.alerts.lifecycle(AlertClip::ErrorOccurred);
                if let Err(e) = self.worker.stop() {
                    warn!("failed to reset worker after error: {e}");
                }
                self.accepting = None;
                self.fps = 0.0;
                self.handler.on_error(&failure.error);
            }
        }
    }
}

impl<H: EventHandler> Drop for Monitor<H> {
    fn drop(&mut self) {
        if self.worker.state() == WorkerState::Running {
            let _ = self.worker.stop();
        }
        self.alerts.shutdown();
    }
}
