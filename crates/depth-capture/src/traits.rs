use std::time::Duration;

use crate::{DepthFrame, DisparityFrame, DisplayImage, Key, Result, StreamConfig};

/// Owner of the physical device and its depth stream.
pub trait SensorSession {
    /// Configure and start streaming.
    fn start(&mut self, config: &StreamConfig) -> Result<()>;

    /// Block until the next depth frame is ready.
    fn wait_for_latest_frame(&mut self) -> Result<DepthFrame>;

    /// Stop streaming and release the device.
    fn stop(&mut self) -> Result<()>;
}

/// Maps a depth frame to its disparity counterpart.
pub trait FrameConverter {
    fn to_disparity(&mut self, depth: &DepthFrame) -> Result<DisparityFrame>;
}

/// Named on-screen windows plus keyboard polling.
pub trait DisplaySurface {
    fn show(&mut self, window: &str, image: &DisplayImage) -> Result<()>;

    fn destroy_all(&mut self) -> Result<()>;

    /// Wait up to `timeout` for a keypress; `None` on timeout.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>>;
}
