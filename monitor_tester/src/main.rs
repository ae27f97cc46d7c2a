use anyhow::{Context, Result, bail};
use fever_monitor::{
    AlertClip, AudioSink, Configuration, Detection, Detector, DetectorError, DetectorFactory,
    DetectorOutput, DisplayImage, Error, EventHandler, Face, Monitor, RawFrame, Severity,
};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const SENSOR_HEIGHT: usize = 24;
const SENSOR_WIDTH: usize = 32;
const AMBIENT: f32 = 30.5;
const FACE_SIZE: i32 = 6;
const RUN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    let Some(options) = Options::parse(&args[1..])? else {
        println!("Usage: monitor_tester <output_dir> [frames] [--config <settings.json>]");
        return Ok(());
    };
    std::fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("failed to create {}", options.output_dir.display()))?;

    let config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => Configuration {
            display_width: Some(320),
            show_fps: true,
            ..Default::default()
        },
    };
    info!(?config, "loaded configuration");

    // --- 2. Monitor Initialization ---
    let factory: Arc<dyn DetectorFactory> = Arc::new(SyntheticFactory);
    let writer = FrameWriter::new(options.output_dir.clone(), options.frames);
    let mut monitor = Monitor::new(factory, Box::new(LoggingSink::default()), writer);
    monitor.start(config)?;

    // --- 3. Main Dispatch Loop ---
    let deadline = Instant::now() + RUN_TIMEOUT;
    loop {
        let handler = monitor.handler();
        if handler.failure.is_some() || handler.saved >= handler.limit {
            break;
        }
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            warn!("timed out after {:?}", RUN_TIMEOUT);
            break;
        };
        tokio::select! {
            dispatched = tokio::time::timeout(remaining, monitor.dispatch_next()) => {
                if matches!(dispatched, Ok(false)) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    // --- 4. Shutdown & Summary ---
    tokio::task::block_in_place(|| monitor.stop())?;
    let dropped = monitor.dropped_frames();
    let handler = monitor.handler_mut();
    if let Some(failure) = handler.failure.take() {
        bail!(failure);
    }
    println!(
        "Processing complete. {} frames ({} over threshold, {} dropped) saved to {}",
        handler.saved,
        handler.violations,
        dropped,
        options.output_dir.display()
    );
    Ok(())
}

struct Options {
    output_dir: PathBuf,
    frames: usize,
    config_path: Option<PathBuf>,
}

impl Options {
    fn parse(args: &[String]) -> Result<Option<Self>> {
        let mut positional = Vec::new();
        let mut config_path = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let path = iter.next().context("--config needs a file path")?;
                    config_path = Some(PathBuf::from(path));
                }
                "-h" | "--help" => return Ok(None),
                _ => positional.push(arg),
            }
        }
        let Some(output_dir) = positional.first() else {
            return Ok(None);
        };
        let frames = match positional.get(1) {
            Some(n) => n.parse().with_context(|| format!("invalid frame count '{n}'"))?,
            None => 30,
        };
        Ok(Some(Self {
            output_dir: PathBuf::from(output_dir),
            frames,
            config_path,
        }))
    }
}

fn load_config(path: &Path) -> Result<Configuration> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: Configuration =
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Builds the synthetic sensor for any model name.
struct SyntheticFactory;

impl DetectorFactory for SyntheticFactory {
    fn create(
        &self,
        config: &Configuration,
    ) -> std::result::Result<Box<dyn Detector>, DetectorError> {
        debug!(model = %config.model_name, use_gpu = config.use_gpu, "building synthetic detector");
        Ok(Box::new(SyntheticSensor {
            model: config.model_name.clone(),
            labels: vec!["face".to_string()],
            tick: 0,
        }))
    }
}

/// A warm face drifting left to right across a cool background. Its peak
/// temperature rises and falls so some frames cross the default threshold.
struct SyntheticSensor {
    model: String,
    labels: Vec<String>,
    tick: u64,
}

impl Detector for SyntheticSensor {
    fn run_once(
        &mut self,
        config: &Configuration,
    ) -> std::result::Result<DetectorOutput, DetectorError> {
        let started = Instant::now();
        std::thread::sleep(Duration::from_millis(60));
        self.tick += 1;

        let phase = self.tick as f32 * 0.2;
        let span = (SENSOR_WIDTH as i32 - FACE_SIZE - 2) as f32;
        let face_x = 1 + ((phase.sin() * 0.5 + 0.5) * span) as i32;
        let face_y = (SENSOR_HEIGHT as i32 - FACE_SIZE) / 2;
        let peak = 36.8 + 2.0 * (phase * 0.5).sin().abs();

        let frame = RawFrame::from_shape_fn((SENSOR_HEIGHT, SENSOR_WIDTH), |(r, c)| {
            let dy = r as f32 - (face_y + FACE_SIZE / 2) as f32;
            let dx = c as f32 - (face_x + FACE_SIZE / 2) as f32;
            let falloff = (-(dx * dx + dy * dy) / 8.0).exp();
            AMBIENT + (peak - AMBIENT) * falloff + ((r * 7 + c * 3) % 5) as f32 * 0.05
        });

        let confidence = 0.9;
        let detections = if confidence >= config.confidence_threshold {
            vec![Detection {
                class_id: 0,
                x: face_x,
                y: face_y,
                w: FACE_SIZE,
                h: FACE_SIZE,
                confidence,
            }]
        } else {
            Vec::new()
        };

        Ok(DetectorOutput {
            frame,
            detections,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Logs clips instead of playing them.
#[derive(Default)]
struct LoggingSink {
    playing_until: Option<Instant>,
}

impl AudioSink for LoggingSink {
    fn init(&mut self) -> fever_monitor::Result<()> {
        Ok(())
    }

    fn play(&mut self, clip: AlertClip) -> fever_monitor::Result<()> {
        info!(%clip, "playing alert");
        self.playing_until = Some(Instant::now() + Duration::from_millis(800));
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.playing_until.is_some_and(|until| Instant::now() < until)
    }

    fn shutdown(&mut self) {}
}

/// Saves every presented frame as a numbered PNG.
struct FrameWriter {
    output_dir: PathBuf,
    limit: usize,
    saved: usize,
    violations: usize,
    failure: Option<String>,
}

impl FrameWriter {
    fn new(output_dir: PathBuf, limit: usize) -> Self {
        Self {
            output_dir,
            limit,
            saved: 0,
            violations: 0,
            failure: None,
        }
    }
}

impl EventHandler for FrameWriter {
    fn on_log(&mut self, text: &str, severity: Severity) {
        debug!(?severity, "worker: {text}");
    }

    fn on_data(&mut self, image: &DisplayImage, fps: f32, faces: &[Face]) {
        if self.saved >= self.limit || self.failure.is_some() {
            return;
        }
        let path = self.output_dir.join(format!("frame_{:04}.png", self.saved + 1));
        if let Err(e) = image.save(&path) {
            self.failure = Some(format!("failed to write {}: {e}", path.display()));
            return;
        }
        self.saved += 1;
        if faces.iter().any(|f| f.over_threshold) {
            self.violations += 1;
        }
        for face in faces {
            debug!(
                temperature = face.measured_temperature,
                over_threshold = face.over_threshold,
                "face"
            );
        }
        info!(frame = self.saved, fps, "saved {}", path.display());
    }

    fn on_error(&mut self, err: &Error) {
        error!("monitor stopped: {err}");
        self.failure = Some(err.to_string());
    }
}
