//! depth-capture: live depth and disparity viewer
//!
//! A [`CaptureLoop`] pulls depth frames from a [`SensorSession`], derives a
//! disparity frame through a [`FrameConverter`] and shows both on a
//! [`DisplaySurface`] until the quit key is pressed. The default build enables
//! the `mock` collaborators so the loop can run and be tested without
//! hardware; `realsense` and `opencv` add the real device and window backends.

mod types;
pub use types::{
    DepthFrame, DisparityFrame, DisplayImage, Key, PixelFormat, Pixels, StereoCalibration,
    StreamConfig, StreamKind,
};

mod error;
pub use error::{Error, Result};

mod traits;
pub use traits::{DisplaySurface, FrameConverter, SensorSession};

mod config;
pub use config::{CaptureConfig, LoopConfig};

mod convert;
pub use convert::InverseDepthConverter;

/// Frame-to-image rules for the two windows
pub mod render;

mod capture_loop;
pub use capture_loop::{run, CaptureLoop, ExitReason, LoopState, LoopSummary};

#[cfg(feature = "mock")]
pub mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockDisplay, MockSensor};

#[cfg(feature = "realsense")]
mod realsense_backend;
#[cfg(feature = "realsense")]
pub use realsense_backend::RealSenseSensor;

#[cfg(feature = "opencv")]
mod opencv_backend;
#[cfg(feature = "opencv")]
pub use opencv_backend::HighGuiDisplay;
