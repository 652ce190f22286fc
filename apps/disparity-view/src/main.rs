use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use depth_capture::{
    CaptureConfig, DisplaySurface, InverseDepthConverter, LoopSummary, SensorSession,
};

#[derive(Parser, Debug)]
#[command(
    name = "disparity-view",
    version,
    about = "Show a depth stream and its disparity map until 'q' is pressed"
)]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<String>,
    /// Depth sensor backend
    #[arg(long, value_enum, default_value_t = SensorKind::Realsense)]
    sensor: SensorKind,
    /// Display backend
    #[arg(long, value_enum, default_value_t = DisplayKind::Opencv)]
    display: DisplayKind,
    /// Override stream width
    #[arg(long)]
    width: Option<u32>,
    /// Override stream height
    #[arg(long)]
    height: Option<u32>,
    /// Override stream frame rate
    #[arg(long)]
    fps: Option<u32>,
    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SensorKind {
    Mock,
    Realsense,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum DisplayKind {
    Mock,
    Opencv,
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let summary = match cli.sensor {
        SensorKind::Mock => with_display(depth_capture::MockSensor::new(), cli.display, &config)?,
        SensorKind::Realsense => realsense(cli.display, &config)?,
    };
    info!(
        frames = summary.frames,
        baseline_mm = ?summary.last_baseline_mm,
        exit = ?summary.exit,
        "capture finished"
    );
    Ok(())
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_config(cli: &Cli) -> Result<CaptureConfig> {
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => CaptureConfig::default(),
    };
    if let Some(w) = cli.width {
        config.stream.width = w;
    }
    if let Some(h) = cli.height {
        config.stream.height = h;
    }
    if let Some(fps) = cli.fps {
        config.stream.fps = fps;
    }
    if cli.max_frames.is_some() {
        config.max_frames = cli.max_frames;
    }
    config.stream.validate().context("stream configuration")?;
    Ok(config)
}

#[cfg(feature = "realsense")]
fn realsense(display: DisplayKind, config: &CaptureConfig) -> Result<LoopSummary> {
    let sensor = depth_capture::RealSenseSensor::new().context("opening RealSense context")?;
    with_display(sensor, display, config)
}

#[cfg(not(feature = "realsense"))]
fn realsense(_display: DisplayKind, _config: &CaptureConfig) -> Result<LoopSummary> {
    anyhow::bail!("RealSense backend not enabled at compile time (use --sensor mock)")
}

fn with_display<S: SensorSession>(
    sensor: S,
    display: DisplayKind,
    config: &CaptureConfig,
) -> Result<LoopSummary> {
    match display {
        DisplayKind::Mock => run(sensor, depth_capture::MockDisplay::new(), config),
        DisplayKind::Opencv => highgui(sensor, config),
    }
}

#[cfg(feature = "opencv")]
fn highgui<S: SensorSession>(sensor: S, config: &CaptureConfig) -> Result<LoopSummary> {
    run(sensor, depth_capture::HighGuiDisplay::new(), config)
}

#[cfg(not(feature = "opencv"))]
fn highgui<S: SensorSession>(_sensor: S, _config: &CaptureConfig) -> Result<LoopSummary> {
    anyhow::bail!("OpenCV display not enabled at compile time (use --display mock)")
}

fn run<S: SensorSession, D: DisplaySurface>(
    sensor: S,
    display: D,
    config: &CaptureConfig,
) -> Result<LoopSummary> {
    let converter = InverseDepthConverter::new(config.fallback_calibration);
    let summary = depth_capture::run(sensor, converter, display, config.loop_config())?;
    Ok(summary)
}
