use std::collections::HashSet;
use std::convert::TryFrom;
use std::time::Duration;

use realsense_rust::{
    config::Config,
    context::Context,
    frame::{DepthFrame as RsDepthFrame, FrameEx, PixelKind},
    kind::{Rs2CameraInfo, Rs2Format, Rs2Option, Rs2ProductLine, Rs2StreamKind},
    pipeline::{ActivePipeline, FrameWaitError, InactivePipeline},
};
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::{DepthFrame, Error, Result, SensorSession, StereoCalibration, StreamConfig};

const FRAME_TIMEOUT: Duration = Duration::from_millis(5000);

/// Intel RealSense D400 depth stream.
pub struct RealSenseSensor {
    context: Context,
    pipeline: Option<ActivePipeline>,
    baseline_mm: Option<f32>,
}

impl RealSenseSensor {
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|e| Error::Backend(e.to_string()))?;
        Ok(Self {
            context,
            pipeline: None,
            baseline_mm: None,
        })
    }
}

impl SensorSession for RealSenseSensor {
    fn start(&mut self, config: &StreamConfig) -> Result<()> {
        config.validate()?;
        let mut lines = HashSet::new();
        lines.insert(Rs2ProductLine::D400);
        let devices = self.context.query_devices(lines);
        let device = devices
            .first()
            .ok_or_else(|| Error::DeviceUnavailable("no RealSense D400 device found".into()))?;
        if let Some(serial) = device.info(Rs2CameraInfo::SerialNumber) {
            info!(serial = %serial.to_string_lossy(), "using RealSense device");
        }

        let pipeline = InactivePipeline::try_from(&self.context)
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;
        let mut rs_config = Config::new();
        rs_config
            .enable_stream(
                Rs2StreamKind::Depth,
                None,
                config.width as usize,
                config.height as usize,
                Rs2Format::Z16,
                config.fps as usize,
            )
            .map_err(|e| Error::StreamConfigRejected(e.to_string()))?;
        let active = pipeline
            .start(Some(rs_config))
            .map_err(|e| Error::StreamConfigRejected(e.to_string()))?;

        self.baseline_mm = active
            .profile()
            .device()
            .sensors()
            .iter()
            .find_map(|s| s.get_option(Rs2Option::StereoBaseline));
        debug!(baseline_mm = ?self.baseline_mm, "stereo baseline");
        self.pipeline = Some(active);
        Ok(())
    }

    fn wait_for_latest_frame(&mut self) -> Result<DepthFrame> {
        let pipeline = self.pipeline.as_mut().ok_or(Error::SessionNotStarted)?;
        let frames = pipeline.wait(Some(FRAME_TIMEOUT)).map_err(|e| match e {
            FrameWaitError::DidTimeoutBeforeFrameArrival => Error::FrameTimeout,
            other => Error::Backend(other.to_string()),
        })?;
        let Some(frame) = frames.frames_of_type::<RsDepthFrame>().pop() else {
            // Framesets without depth render as empty.
            return Ok(DepthFrame {
                ts: Some(OffsetDateTime::now_utc()),
                ..DepthFrame::default()
            });
        };

        let (width, height) = (frame.width(), frame.height());
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                let sample = match frame.get(col, row) {
                    Some(PixelKind::Z16 { depth }) => *depth as i16,
                    _ => 0,
                };
                data.push(sample);
            }
        }

        let focal_px = frame.stream_profile().intrinsics().ok().map(|i| i.fx());
        let depth_units_mm = frame.depth_units().ok().map(|u| u * 1000.0);
        let calibration = match (focal_px, self.baseline_mm, depth_units_mm) {
            (Some(focal_px), Some(baseline_mm), Some(depth_units_mm)) => Some(StereoCalibration {
                focal_px,
                baseline_mm,
                depth_units_mm,
            }),
            _ => None,
        };

        Ok(DepthFrame {
            width: width as u32,
            height: height as u32,
            data,
            calibration,
            ts: Some(OffsetDateTime::now_utc()),
        })
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(active) = self.pipeline.take() {
            let _inactive = active.stop();
            info!("RealSense pipeline stopped");
        }
        Ok(())
    }
}
