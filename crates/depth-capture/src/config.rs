use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, StereoCalibration, StreamConfig};

/// On-disk configuration (YAML). Every key is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub stream: StreamConfig,
    pub quit_key: char,
    pub poll_interval_ms: u64,
    pub max_frames: Option<u64>,
    /// Used when the sensor does not report its own intrinsics.
    pub fallback_calibration: StereoCalibration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            quit_key: 'q',
            poll_interval_ms: 10,
            max_frames: None,
            fallback_calibration: StereoCalibration::default(),
        }
    }
}

impl CaptureConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        cfg.stream.validate()?;
        Ok(cfg)
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            stream: self.stream,
            quit_key: self.quit_key,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_frames: self.max_frames,
        }
    }
}

/// Runtime parameters of the capture loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopConfig {
    pub stream: StreamConfig,
    pub quit_key: char,
    pub poll_interval: Duration,
    pub max_frames: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        CaptureConfig::default().loop_config()
    }
}
