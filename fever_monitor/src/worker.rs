// THEORY:
// The `WorkerController` owns the one background thread that turns detector
// output into presentable frames. The foreground never touches the detector or
// the frame data directly; it starts, stops and reconfigures the worker and
// reads what the worker reports through the event queue.
//
// Key architectural principles:
// 1.  **Fail before spawning**: `start` validates the configuration and builds
//     the detector on the caller's thread. A run that cannot work never gets a
//     thread.
// 2.  **Cooperative cancellation**: the loop checks a shared flag once per
//     iteration. Frames are emitted under an emit gate that `stop` also takes
//     while raising the flag, so once `stop` returns no frame can follow.
// 3.  **Whole-value reconfiguration**: the configuration lives in a `watch`
//     channel. The loop takes one snapshot per iteration and never sees a
//     half-written value. A new model name rebuilds the detector in place.
// 4.  **One fault, one report**: any failure inside an iteration ends the run,
//     a panic included. It is wrapped as a runtime failure, reported once as an
//     `ErrorEvent` tagged with its run, and the state goes
//     `Running -> Error -> Idle`. There is no retry.

use std::any::Any;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Configuration;
use crate::detector::{Detector, DetectorFactory};
use crate::error::{Error, Result};
use crate::events::{
    self, DataEvent, EVENT_QUEUE_CAPACITY, EventReceiver, EventSender, Severity,
};
use crate::pipeline::FramePipeline;

pub const WORKER_THREAD_NAME: &str = "fever-monitor-worker";

/// How long `stop` waits for the thread before detaching it.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Idle,
    Running,
    /// A fault ended the run and is being reported.
    Error,
}

/// State shared between the controller and its run threads. The generation
/// keeps a lingering thread from an earlier run from overwriting the state of
/// the current one.
#[derive(Debug)]
struct Status {
    state: WorkerState,
    generation: u64,
}

type SharedStatus = Arc<Mutex<Status>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sets `state` only if `generation` is still the current run.
fn transition(status: &SharedStatus, generation: u64, state: WorkerState) {
    let mut status = lock(status);
    if status.generation == generation {
        status.state = state;
    }
}

/// Describes a panic payload caught on the worker thread.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("worker iteration panicked: {detail}")
}

/// Handles to one spawned run.
struct ActiveRun {
    config: watch::Sender<Configuration>,
    cancel: Arc<AtomicBool>,
    emit_gate: Arc<Mutex<()>>,
    handle: JoinHandle<()>,
}

pub struct WorkerController {
    factory: Arc<dyn DetectorFactory>,
    events: Arc<EventSender>,
    receiver: Option<EventReceiver>,
    status: SharedStatus,
    run: Option<ActiveRun>,
    join_timeout: Duration,
}

impl WorkerController {
    pub fn new(factory: Arc<dyn DetectorFactory>) -> Self {
        Self::with_capacity(factory, EVENT_QUEUE_CAPACITY)
    }

    /// Creates a controller whose event queue holds up to `capacity` events.
    pub fn with_capacity(factory: Arc<dyn DetectorFactory>, capacity: usize) -> Self {
        let (mut controller, receiver) = Self::split(factory, capacity);
        controller.receiver = Some(receiver);
        controller
    }

    /// Creates a controller and hands the consumer end of its event queue
    /// straight to the caller.
    pub fn split(factory: Arc<dyn DetectorFactory>, capacity: usize) -> (Self, EventReceiver) {
        let (events, receiver) = events::channel(capacity);
        let controller = Self {
            factory,
            events: Arc::new(events),
            receiver: None,
            status: Arc::new(Mutex::new(Status {
                state: WorkerState::Idle,
                generation: 0,
            })),
            run: None,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        };
        (controller, receiver)
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Hands out the consumer end of the event queue. Only the first call
    /// returns `Some`.
    pub fn take_events(&mut self) -> Option<EventReceiver> {
        self.receiver.take()
    }

    pub fn state(&self) -> WorkerState {
        lock(&self.status).state
    }

    /// Identifier of the most recently started run. Events carry the
    /// identifier of the run that emitted them.
    pub fn current_run(&self) -> u64 {
        lock(&self.status).generation
    }

    /// The configuration the current run is using, if a run is active.
    pub fn configuration(&self) -> Option<Configuration> {
        self.run.as_ref().map(|run| run.config.borrow().clone())
    }

    /// Frames dropped so far because the consumer fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.events.dropped_frames()
    }

    pub fn start(&mut self, config: Configuration) -> Result<()> {
        match self.state() {
            WorkerState::Running => {
                return Err(Error::InvalidState("worker is already running".to_string()));
            }
            WorkerState::Error => {
                return Err(Error::InvalidState(
                    "worker is still reporting a failure".to_string(),
                ));
            }
            WorkerState::Idle => {}
        }
        self.reap();

        config.validate()?;
        let detector = self.factory.create(&config)?;
        info!(model = %config.model_name, "detector ready, starting worker");

        let generation = {
            let mut status = lock(&self.status);
            status.generation += 1;
            status.state = WorkerState::Running;
            status.generation
        };

        let (config_tx, config_rx) = watch::channel(config);
        let cancel = Arc::new(AtomicBool::new(false));
        let emit_gate = Arc::new(Mutex::new(()));
        let run_loop = RunLoop {
            pipeline: FramePipeline::new(detector.labels().to_vec()),
            detector,
            factory: Arc::clone(&self.factory),
            config: config_rx,
            events: Arc::clone(&self.events),
            cancel: Arc::clone(&cancel),
            emit_gate: Arc::clone(&emit_gate),
            status: Arc::clone(&self.status),
            generation,
            frame_number: 0,
        };

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_loop.run());
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                transition(&self.status, generation, WorkerState::Idle);
                return Err(Error::Runtime(format!("failed to spawn worker thread: {e}")));
            }
        };

        self.run = Some(ActiveRun {
            config: config_tx,
            cancel,
            emit_gate,
            handle,
        });
        Ok(())
    }

    /// Ends the current run. Once this returns the worker emits no further
    /// `DataEvent`. Stopping an idle controller is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        let Some(run) = self.run.take() else {
            return Ok(());
        };

        {
            let _gate = lock(&run.emit_gate);
            run.cancel.store(true, Ordering::Release);
        }
        lock(&self.status).state = WorkerState::Idle;
        debug!("stop requested, waiting for worker thread");

        let deadline = Instant::now() + self.join_timeout;
        while !run.handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    "worker thread did not finish in time, detaching it"
                );
                return Ok(());
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }
        if run.handle.join().is_err() {
            error!("worker thread panicked");
        }
        Ok(())
    }

    /// Swaps in a new configuration for the running loop. Takes effect at the
    /// start of the next iteration.
    pub fn change_configuration(&mut self, config: Configuration) -> Result<()> {
        let run = match (&self.run, self.state()) {
            (Some(run), WorkerState::Running) => run,
            _ => return Err(Error::InvalidState("no active run to reconfigure".to_string())),
        };
        config.validate()?;
        debug!(?config, "configuration replaced");
        run.config.send_replace(config);
        Ok(())
    }

    /// Joins a thread that already ended on its own.
    fn reap(&mut self) {
        if self.run.as_ref().is_some_and(|run| run.handle.is_finished()) {
            if let Some(run) = self.run.take() {
                if run.handle.join().is_err() {
                    error!("worker thread panicked");
                }
            }
        }
    }
}

impl Drop for WorkerController {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Everything the background thread owns for one run.
struct RunLoop {
    detector: Box<dyn Detector>,
    factory: Arc<dyn DetectorFactory>,
    pipeline: FramePipeline,
    config: watch::Receiver<Configuration>,
    events: Arc<EventSender>,
    cancel: Arc<AtomicBool>,
    emit_gate: Arc<Mutex<()>>,
    status: SharedStatus,
    generation: u64,
    frame_number: u64,
}

impl RunLoop {
    fn run(mut self) {
        self.events.log(Severity::Info, "worker thread alive");

        let outcome = loop {
            if self.cancel.load(Ordering::Acquire) {
                break Ok(());
            }
            match panic::catch_unwind(AssertUnwindSafe(|| self.step())) {
                Ok(Ok(ControlFlow::Continue(()))) => {}
                Ok(Ok(ControlFlow::Break(()))) => break Ok(()),
                Ok(Err(e)) => break Err(e.into_runtime()),
                Err(payload) => {
                    break Err(Error::Runtime(panic_message(payload.as_ref())));
                }
            }
        };

        if let Err(e) = outcome {
            self.report(e);
        }
        self.events.log(
            Severity::Info,
            format!("worker thread exiting after {} frames", self.frame_number),
        );
    }

    fn step(&mut self) -> Result<ControlFlow<()>> {
        // --- 1. Snapshot the configuration ---
        let config = self.config.borrow_and_update().clone();

        // --- 2. Rebuild the detector if the model changed ---
        if config.model_name != self.detector.model_name() {
            self.detector = self.factory.create(&config)?;
            self.pipeline.set_labels(self.detector.labels().to_vec());
            self.events.log(
                Severity::Info,
                format!("detector reloaded with model '{}'", config.model_name),
            );
        }

        // --- 3. Acquire and process one frame ---
        let output = self.detector.run_once(&config)?;
        let report = self.pipeline.process(&output, &config)?;
        self.frame_number += 1;

        // --- 4. Emit, unless a stop slipped in ---
        let _gate = lock(&self.emit_gate);
        if self.cancel.load(Ordering::Acquire) {
            return Ok(ControlFlow::Break(()));
        }
        self.events.data(DataEvent {
            image: report.image,
            fps: report.fps,
            faces: report.faces,
            frame_number: self.frame_number,
            run: self.generation,
        });
        Ok(ControlFlow::Continue(()))
    }

    fn report(&self, error: Error) {
        {
            let _gate = lock(&self.emit_gate);
            if self.cancel.load(Ordering::Acquire) {
                debug!("worker failed after stop was requested: {error}");
                return;
            }
            transition(&self.status, self.generation, WorkerState::Error);
        }
        self.events.error(self.generation, error);
        transition(&self.status, self.generation, WorkerState::Idle);
    }
}
