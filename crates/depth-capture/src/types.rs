use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    #[default]
    Depth,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 16-bit depth samples in sensor units.
    #[default]
    Z16,
    /// 32-bit float disparity samples.
    Disparity32,
}

/// Stream request handed to the sensor session before it starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub kind: StreamKind,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub fps: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            kind: StreamKind::Depth,
            width: 640,
            height: 480,
            format: PixelFormat::Z16,
            fps: 30,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::StreamConfigRejected(format!(
                "resolution {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(Error::StreamConfigRejected("frame rate must be > 0".into()));
        }
        if self.format != PixelFormat::Z16 {
            return Err(Error::StreamConfigRejected(format!(
                "{:?} is not a depth format",
                self.format
            )));
        }
        Ok(())
    }
}

/// Intrinsics a sensor reports alongside each depth frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoCalibration {
    /// Horizontal focal length in pixels.
    pub focal_px: f32,
    /// Distance between the two imagers in millimeters.
    pub baseline_mm: f32,
    /// Millimeters per raw depth unit.
    pub depth_units_mm: f32,
}

impl Default for StereoCalibration {
    fn default() -> Self {
        // Typical D435 values at 640x480
        Self {
            focal_px: 383.0,
            baseline_mm: 50.0,
            depth_units_mm: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<i16>,
    pub calibration: Option<StereoCalibration>,
    pub ts: Option<OffsetDateTime>,
}

impl DepthFrame {
    /// True when there is nothing renderable: no samples, zero extent or a
    /// buffer that does not match the advertised size.
    pub fn is_empty(&self) -> bool {
        buffer_is_empty(self.width, self.height, self.data.len())
    }
}

#[derive(Clone, Debug, Default)]
pub struct DisparityFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
    pub baseline_mm: f32,
    pub ts: Option<OffsetDateTime>,
}

impl DisparityFrame {
    pub fn is_empty(&self) -> bool {
        buffer_is_empty(self.width, self.height, self.data.len())
    }
}

fn buffer_is_empty(width: u32, height: u32, len: usize) -> bool {
    len == 0 || width == 0 || height == 0 || (width as usize) * (height as usize) != len
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pixels {
    Gray8(Vec<u8>),
    Float32(Vec<f32>),
}

/// A single-channel image ready for a display surface.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Pixels,
}

/// A key reported by a display surface.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Key(pub char);
