// THEORY:
// The `events` module is the only bridge between the background worker and the
// foreground consumer. Instead of calling into the consumer from the worker's
// thread, the worker pushes `WorkerEvent`s into a bounded channel and the
// consumer drains it on its own schedule: blocking, async, or as a stream.
//
// Key architectural principles:
// 1.  **One ordered queue**: logs, frames and errors travel through the same
//     channel, so the order in which the worker emits events of any one kind is
//     the order in which the consumer sees them.
// 2.  **Frames never block the producer**: a consumer that falls behind loses
//     frames, which are counted. Log lines are best-effort as well. Only the
//     terminal error waits for room in the queue.
// 3.  **Mirrored logging**: every log event is also written to `tracing` so the
//     process log and the consumer's log view tell the same story.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::core_modules::frame::{DisplayImage, Face};
use crate::error::Error;

/// Default number of events buffered between worker and consumer.
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Severity of a log line sent to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub text: String,
    pub severity: Severity,
}

/// A processed frame, ready for display.
#[derive(Debug, Clone)]
pub struct DataEvent {
    pub image: DisplayImage,
    pub fps: f32,
    pub faces: Vec<Face>,
    /// Sequence number of the frame within its run, starting at 1.
    pub frame_number: u64,
    /// Run that produced the frame, see [`WorkerController::current_run`].
    ///
    /// [`WorkerController::current_run`]: crate::worker::WorkerController::current_run
    pub run: u64,
}

/// The fault that ended a run.
#[derive(Debug)]
pub struct ErrorEvent {
    pub error: Error,
    pub run: u64,
}

#[derive(Debug)]
pub enum WorkerEvent {
    Log(LogEvent),
    Data(DataEvent),
    Error(ErrorEvent),
}

/// Creates a connected sender/receiver pair holding up to `capacity` events.
pub(crate) fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSender {
            tx,
            dropped_frames: AtomicU64::new(0),
        },
        EventReceiver { rx },
    )
}

/// Producer half, owned by the worker.
pub(crate) struct EventSender {
    tx: mpsc::Sender<WorkerEvent>,
    dropped_frames: AtomicU64,
}

impl EventSender {
    pub(crate) fn log(&self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        match severity {
            Severity::Debug => debug!("{text}"),
            Severity::Info => info!("{text}"),
            Severity::Warning => warn!("{text}"),
            Severity::Error => error!("{text}"),
        }
        let event = WorkerEvent::Log(LogEvent { text, severity });
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            debug!("event queue full, log line not forwarded to consumer");
        }
    }

    /// Offers a frame to the consumer. Returns `false` if it was dropped.
    pub(crate) fn data(&self, event: DataEvent) -> bool {
        match self.tx.try_send(WorkerEvent::Data(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped_frames.fetch_add(1, Ordering::Relaxed) + 1;
                if let WorkerEvent::Data(frame) = event {
                    debug!(
                        frame = frame.frame_number,
                        dropped_total = dropped,
                        "consumer backlog, dropping frame"
                    );
                }
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Reports the fault that ended the run. Waits for queue space, so it must
    /// only be called from the worker thread.
    pub(crate) fn error(&self, run: u64, error: Error) {
        error!(run, "worker failed: {error}");
        let _ = self.tx.blocking_send(WorkerEvent::Error(ErrorEvent { error, run }));
    }

    pub(crate) fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

/// Consumer half of the event queue.
pub struct EventReceiver {
    rx: mpsc::Receiver<WorkerEvent>,
}

impl EventReceiver {
    /// Waits for the next event. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        self.rx.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv). Must not be called from
    /// inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<WorkerEvent> {
        self.rx.blocking_recv()
    }

    /// Returns an event if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<WorkerEvent> {
        self.rx.try_recv().ok()
    }

    /// Takes every event that is ready right now.
    pub fn drain(&mut self) -> Vec<WorkerEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Adapts the receiver into an async stream of events.
    pub fn into_stream(self) -> impl Stream<Item = WorkerEvent> {
        futures::stream::unfold(self, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
    }
}
