use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use time::OffsetDateTime;

use crate::{
    DepthFrame, DisplayImage, DisplaySurface, Error, Key, Pixels, Result, SensorSession,
    StereoCalibration, StreamConfig,
};

/// One observed call into a mock collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Start,
    Acquire { width: u32, height: u32 },
    Stop,
    Show { window: String, width: u32, height: u32, float: bool },
    DestroyAll,
    PollKey,
}

/// Shared, ordered record of calls across mock sensors and displays.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    inner: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn push(&self, call: Call) {
        self.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.lock().iter().filter(|c| pred(c)).count()
    }
}

enum FrameSource {
    Ramp,
    Scripted(VecDeque<DepthFrame>),
}

/// In-process depth sensor. Produces a synthetic ramp by default, or replays
/// scripted frames and then times out.
pub struct MockSensor {
    source: FrameSource,
    start_error: Option<Error>,
    config: Option<StreamConfig>,
    counter: u64,
    log: CallLog,
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSensor {
    pub fn new() -> Self {
        Self {
            source: FrameSource::Ramp,
            start_error: None,
            config: None,
            counter: 0,
            log: CallLog::new(),
        }
    }

    pub fn scripted(frames: impl IntoIterator<Item = DepthFrame>) -> Self {
        Self {
            source: FrameSource::Scripted(frames.into_iter().collect()),
            ..Self::new()
        }
    }

    /// Make the next `start` fail with `err`.
    pub fn fail_start(mut self, err: Error) -> Self {
        self.start_error = Some(err);
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

fn ramp_frame(config: &StreamConfig, counter: u64) -> DepthFrame {
    let (width, height) = (config.width, config.height);
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let step = (u64::from(x + y) + counter) % 256;
            data.push(500 + (step as i16) * 30);
        }
    }
    DepthFrame {
        width,
        height,
        data,
        calibration: Some(StereoCalibration::default()),
        ts: Some(OffsetDateTime::now_utc()),
    }
}

impl SensorSession for MockSensor {
    fn start(&mut self, config: &StreamConfig) -> Result<()> {
        self.log.push(Call::Start);
        if let Some(err) = self.start_error.take() {
            return Err(err);
        }
        config.validate()?;
        self.config = Some(*config);
        Ok(())
    }

    fn wait_for_latest_frame(&mut self) -> Result<DepthFrame> {
        let config = self.config.ok_or(Error::SessionNotStarted)?;
        let frame = match &mut self.source {
            FrameSource::Ramp => ramp_frame(&config, self.counter),
            FrameSource::Scripted(frames) => frames.pop_front().ok_or(Error::FrameTimeout)?,
        };
        self.counter += 1;
        self.log.push(Call::Acquire {
            width: frame.width,
            height: frame.height,
        });
        Ok(frame)
    }

    fn stop(&mut self) -> Result<()> {
        self.log.push(Call::Stop);
        self.config = None;
        Ok(())
    }
}

/// Headless display that records what would have been drawn and replays a
/// fixed key sequence. Once the script runs out every poll times out.
#[derive(Default)]
pub struct MockDisplay {
    keys: VecDeque<Option<char>>,
    log: CallLog,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` entries are poll timeouts.
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = Option<char>>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }
}

impl DisplaySurface for MockDisplay {
    fn show(&mut self, window: &str, image: &DisplayImage) -> Result<()> {
        self.log.push(Call::Show {
            window: window.to_string(),
            width: image.width,
            height: image.height,
            float: matches!(image.pixels, Pixels::Float32(_)),
        });
        Ok(())
    }

    fn destroy_all(&mut self) -> Result<()> {
        self.log.push(Call::DestroyAll);
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<Key>> {
        self.log.push(Call::PollKey);
        Ok(self.keys.pop_front().flatten().map(Key))
    }
}
