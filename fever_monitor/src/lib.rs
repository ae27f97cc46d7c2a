// THEORY:
// This file is the entry point of the `fever_monitor` library crate. It turns
// raw thermal-sensor frames into annotated, displayable images, measures every
// detected face against a temperature threshold and decides when to sound an
// alert.
//
// The public surface is deliberately small. Most consumers need only the
// `Monitor` (foreground control and event dispatch), the `Configuration` it
// runs with, and the `Detector`/`AudioSink` traits they implement to plug in a
// sensor, a model and an audio device. The frame-level building blocks in
// `core_modules` are public as well, so they can be used on single frames
// without starting a worker.

pub mod alerts;
pub mod config;
pub mod core_modules;
pub mod detector;
pub mod error;
pub mod events;
pub mod monitor;
pub mod pipeline;
pub mod worker;

pub use alerts::{AlertClip, AlertService, AudioSink, SilentSink};
pub use config::{Configuration, TempUnit};
pub use core_modules::colormap::Colormap;
pub use core_modules::frame::{ColorFrame, Detection, DisplayImage, Face, RawFrame, Rect};
pub use detector::{Detector, DetectorError, DetectorFactory, DetectorOutput};
pub use error::{Error, Result};
pub use events::{DataEvent, ErrorEvent, EventReceiver, LogEvent, Severity, WorkerEvent};
pub use monitor::{EventHandler, Monitor};
pub use pipeline::{FramePipeline, FrameReport};
pub use worker::{WorkerController, WorkerState};
