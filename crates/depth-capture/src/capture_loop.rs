use tracing::{debug, info, warn};

use crate::render::{self, DEPTH_WINDOW, DISPARITY_WINDOW};
use crate::{
    DepthFrame, DisparityFrame, DisplaySurface, Error, FrameConverter, Key, LoopConfig, Result,
    SensorSession,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoopState {
    Running,
    Stopped,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitReason {
    QuitKey,
    FrameLimit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub last_baseline_mm: Option<f32>,
    pub exit: ExitReason,
}

/// Acquire, convert, display, repeat.
///
/// Owns the sensor session and the display for its whole lifetime. The
/// session is started on construction; it is stopped and every window is
/// closed exactly once, either when the quit key is seen or when the loop is
/// dropped while still running (including after an error).
pub struct CaptureLoop<S, C, D>
where
    S: SensorSession,
    C: FrameConverter,
    D: DisplaySurface,
{
    sensor: S,
    converter: C,
    display: D,
    config: LoopConfig,
    state: LoopState,
    frames: u64,
    last_baseline_mm: Option<f32>,
    depth: DepthFrame,
    disparity: DisparityFrame,
}

impl<S, C, D> CaptureLoop<S, C, D>
where
    S: SensorSession,
    C: FrameConverter,
    D: DisplaySurface,
{
    /// Start the sensor session. A start failure is returned unchanged and no
    /// frame is ever requested.
    pub fn start(mut sensor: S, converter: C, mut display: D, config: LoopConfig) -> Result<Self> {
        let stream = config.stream;
        info!(
            width = stream.width,
            height = stream.height,
            fps = stream.fps,
            "starting depth stream"
        );
        if let Err(e) = sensor.start(&stream) {
            if let Err(close) = display.destroy_all() {
                warn!(error = %close, "failed to close display after start failure");
            }
            return Err(e);
        }
        Ok(Self {
            sensor,
            converter,
            display,
            config,
            state: LoopState::Running,
            frames: 0,
            last_baseline_mm: None,
            depth: DepthFrame::default(),
            disparity: DisparityFrame::default(),
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn last_baseline_mm(&self) -> Option<f32> {
        self.last_baseline_mm
    }

    /// Run until the quit key (or the optional frame limit). Any collaborator
    /// error aborts the loop and is returned as-is.
    pub fn run(&mut self) -> Result<LoopSummary> {
        if self.state != LoopState::Running {
            return Err(Error::SessionNotStarted);
        }
        loop {
            self.update()?;
            self.show()?;

            match self.display.poll_key(self.config.poll_interval)? {
                Some(Key(k)) if k == self.config.quit_key => {
                    info!(frames = self.frames, "quit key pressed");
                    return self.finish(ExitReason::QuitKey);
                }
                Some(key) => debug!(?key, "ignoring key"),
                None => {}
            }

            if let Some(limit) = self.config.max_frames {
                if self.frames >= limit {
                    info!(frames = self.frames, "frame limit reached");
                    return self.finish(ExitReason::FrameLimit);
                }
            }
        }
    }

    /// Close all windows and stop the sensor. Idempotent.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == LoopState::Stopped {
            return Ok(());
        }
        self.state = LoopState::Stopped;
        let closed = self.display.destroy_all();
        let stopped = self.sensor.stop();
        info!(frames = self.frames, "depth stream stopped");
        closed.and(stopped)
    }

    fn finish(&mut self, exit: ExitReason) -> Result<LoopSummary> {
        self.shutdown()?;
        Ok(LoopSummary {
            frames: self.frames,
            last_baseline_mm: self.last_baseline_mm,
            exit,
        })
    }

    fn update(&mut self) -> Result<()> {
        self.depth = self.sensor.wait_for_latest_frame()?;
        self.disparity = self.converter.to_disparity(&self.depth)?;
        self.last_baseline_mm = Some(self.disparity.baseline_mm);
        self.frames += 1;
        debug!(
            frame = self.frames,
            depth_w = self.depth.width,
            depth_h = self.depth.height,
            disparity_w = self.disparity.width,
            disparity_h = self.disparity.height,
            baseline_mm = self.disparity.baseline_mm,
            "frame acquired"
        );
        Ok(())
    }

    fn show(&mut self) -> Result<()> {
        match render::depth_to_gray8(&self.depth) {
            Some(img) => self.display.show(DEPTH_WINDOW, &img)?,
            None => debug!(frame = self.frames, "empty depth buffer, not shown"),
        }
        match render::disparity_to_image(&self.disparity) {
            Some(img) => self.display.show(DISPARITY_WINDOW, &img)?,
            None => debug!(frame = self.frames, "empty disparity buffer, not shown"),
        }
        Ok(())
    }
}

impl<S, C, D> Drop for CaptureLoop<S, C, D>
where
    S: SensorSession,
    C: FrameConverter,
    D: DisplaySurface,
{
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "failed to release depth session");
        }
    }
}

/// Start a session and run it to completion. The session is released on
/// every exit path.
pub fn run<S, C, D>(sensor: S, converter: C, display: D, config: LoopConfig) -> Result<LoopSummary>
where
    S: SensorSession,
    C: FrameConverter,
    D: DisplaySurface,
{
    let mut capture = CaptureLoop::start(sensor, converter, display, config)?;
    capture.run()
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::mock::{Call, CallLog, MockDisplay, MockSensor};
    use crate::{InverseDepthConverter, StreamConfig};

    fn depth(width: u32, height: u32) -> DepthFrame {
        DepthFrame {
            width,
            height,
            data: vec![1000; (width * height) as usize],
            ..DepthFrame::default()
        }
    }

    fn small_config() -> LoopConfig {
        LoopConfig {
            stream: StreamConfig {
                width: 4,
                height: 3,
                ..StreamConfig::default()
            },
            ..LoopConfig::default()
        }
    }

    fn is_stop(c: &Call) -> bool {
        *c == Call::Stop
    }

    fn is_destroy(c: &Call) -> bool {
        *c == Call::DestroyAll
    }

    struct EmptyDisparity;

    impl FrameConverter for EmptyDisparity {
        fn to_disparity(&mut self, _depth: &DepthFrame) -> Result<DisparityFrame> {
            Ok(DisparityFrame::default())
        }
    }

    #[test]
    fn renders_each_frame_once_in_arrival_order() {
        let log = CallLog::new();
        let frames: Vec<_> = (1..=5).map(|w| depth(w, 2)).collect();
        let sensor = MockSensor::scripted(frames).with_log(log.clone());
        let display = MockDisplay::new().with_log(log.clone());
        let config = LoopConfig {
            max_frames: Some(5),
            ..small_config()
        };

        let summary = run(sensor, InverseDepthConverter::default(), display, config).unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.exit, ExitReason::FrameLimit);

        let depth_widths: Vec<u32> = log
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Show { window, width, .. } if window == DEPTH_WINDOW => Some(width),
                _ => None,
            })
            .collect();
        assert_eq!(depth_widths, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            log.count(|c| matches!(c, Call::Show { window, .. } if window == DISPARITY_WINDOW)),
            5
        );
    }

    #[test]
    fn disparity_is_shown_as_float_after_depth() {
        let log = CallLog::new();
        let sensor = MockSensor::scripted(vec![depth(2, 2)]).with_log(log.clone());
        let display = MockDisplay::new().with_keys([Some('q')]).with_log(log.clone());
        run(sensor, InverseDepthConverter::default(), display, small_config()).unwrap();

        let shows: Vec<Call> = log
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Show { .. }))
            .collect();
        assert_eq!(
            shows,
            vec![
                Call::Show {
                    window: DEPTH_WINDOW.into(),
                    width: 2,
                    height: 2,
                    float: false
                },
                Call::Show {
                    window: DISPARITY_WINDOW.into(),
                    width: 2,
                    height: 2,
                    float: true
                },
            ]
        );
    }

    #[test]
    fn empty_depth_frame_is_not_shown() {
        let log = CallLog::new();
        let sensor = MockSensor::scripted(vec![DepthFrame::default(), depth(2, 2)])
            .with_log(log.clone());
        let display = MockDisplay::new()
            .with_keys([None, Some('q')])
            .with_log(log.clone());
        let summary = run(sensor, InverseDepthConverter::default(), display, small_config()).unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(
            log.count(|c| matches!(c, Call::Show { window, .. } if window == DEPTH_WINDOW)),
            1
        );
    }

    #[test]
    fn empty_disparity_frame_is_not_shown() {
        let log = CallLog::new();
        let sensor = MockSensor::scripted(vec![depth(2, 2)]).with_log(log.clone());
        let display = MockDisplay::new().with_keys([Some('q')]).with_log(log.clone());
        run(sensor, EmptyDisparity, display, small_config()).unwrap();

        assert_eq!(
            log.count(|c| matches!(c, Call::Show { window, .. } if window == DISPARITY_WINDOW)),
            0
        );
        assert_eq!(
            log.count(|c| matches!(c, Call::Show { window, .. } if window == DEPTH_WINDOW)),
            1
        );
    }

    #[test]
    fn quit_key_stops_exactly_once() {
        let log = CallLog::new();
        let sensor = MockSensor::new().with_log(log.clone());
        let display = MockDisplay::new()
            .with_keys([None, Some('a'), Some('q')])
            .with_log(log.clone());
        let mut capture = CaptureLoop::start(
            sensor,
            InverseDepthConverter::default(),
            display,
            small_config(),
        )
        .unwrap();

        let summary = capture.run().unwrap();
        assert_eq!(summary.exit, ExitReason::QuitKey);
        assert_eq!(summary.frames, 3);
        assert_eq!(capture.state(), LoopState::Stopped);
        drop(capture);

        assert_eq!(log.count(is_stop), 1);
        assert_eq!(log.count(is_destroy), 1);
        let calls = log.calls();
        let last_poll = calls.iter().rposition(|c| *c == Call::PollKey).unwrap();
        assert!(calls[last_poll + 1..].contains(&Call::Stop));
        assert!(calls[last_poll + 1..].contains(&Call::DestroyAll));
    }

    #[test]
    fn other_keys_and_timeouts_keep_running() {
        let log = CallLog::new();
        let sensor = MockSensor::new().with_log(log.clone());
        let display = MockDisplay::new()
            .with_keys([Some('x'), None, Some('Q'), None])
            .with_log(log.clone());
        let config = LoopConfig {
            max_frames: Some(4),
            ..small_config()
        };
        let summary = run(sensor, InverseDepthConverter::default(), display, config).unwrap();

        assert_eq!(summary.frames, 4);
        assert_eq!(summary.exit, ExitReason::FrameLimit);
        assert_eq!(log.count(|c| matches!(c, Call::Acquire { .. })), 4);
        let calls = log.calls();
        let first_stop = calls.iter().position(is_stop).unwrap();
        let last_acquire = calls
            .iter()
            .rposition(|c| matches!(c, Call::Acquire { .. }))
            .unwrap();
        assert!(first_stop > last_acquire);
    }

    #[test]
    fn configured_quit_key_is_honoured() {
        let log = CallLog::new();
        let sensor = MockSensor::new().with_log(log.clone());
        let display = MockDisplay::new()
            .with_keys([Some('q'), Some('x')])
            .with_log(log.clone());
        let config = LoopConfig {
            quit_key: 'x',
            ..small_config()
        };
        let summary = run(sensor, InverseDepthConverter::default(), display, config).unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.exit, ExitReason::QuitKey);
    }

    #[test]
    fn start_failure_propagates_without_acquiring() {
        let log = CallLog::new();
        let sensor = MockSensor::new()
            .fail_start(Error::DeviceUnavailable("no D400 device".into()))
            .with_log(log.clone());
        let display = MockDisplay::new().with_log(log.clone());

        let err = run(sensor, InverseDepthConverter::default(), display, small_config()).unwrap_err();
        match err {
            Error::DeviceUnavailable(msg) => assert_eq!(msg, "no D400 device"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(log.count(|c| matches!(c, Call::Acquire { .. })), 0);
        assert_eq!(log.count(|c| matches!(c, Call::Show { .. })), 0);
        assert_eq!(log.count(is_stop), 0);
    }

    #[test]
    fn acquisition_error_releases_session_on_drop() {
        let log = CallLog::new();
        let sensor = MockSensor::scripted(vec![depth(2, 2)]).with_log(log.clone());
        let display = MockDisplay::new().with_log(log.clone());

        let err = run(sensor, InverseDepthConverter::default(), display, small_config()).unwrap_err();
        assert!(matches!(err, Error::FrameTimeout));
        assert_eq!(log.count(is_stop), 1);
        assert_eq!(log.count(is_destroy), 1);
    }

    #[test]
    fn disparity_size_tracks_each_frame() {
        let log = CallLog::new();
        let sensor = MockSensor::scripted(vec![depth(4, 3), depth(2, 1)]).with_log(log.clone());
        let display = MockDisplay::new().with_log(log.clone());
        let config = LoopConfig {
            max_frames: Some(2),
            ..small_config()
        };
        run(sensor, InverseDepthConverter::default(), display, config).unwrap();

        let sizes: Vec<(u32, u32)> = log
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Show {
                    window,
                    width,
                    height,
                    ..
                } if window == DISPARITY_WINDOW => Some((width, height)),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![(4, 3), (2, 1)]);
    }

    #[test]
    fn baseline_comes_from_converter_output() {
        let sensor = MockSensor::scripted(vec![depth(1, 1)]);
        let display = MockDisplay::new().with_keys([Some('q')]);
        let converter = InverseDepthConverter::new(crate::StereoCalibration {
            focal_px: 400.0,
            baseline_mm: 55.0,
            depth_units_mm: 1.0,
        });
        let summary = run(sensor, converter, display, small_config()).unwrap();
        assert_eq!(summary.last_baseline_mm, Some(55.0));
    }

    #[test]
    fn run_after_shutdown_is_rejected() {
        let mut capture = CaptureLoop::start(
            MockSensor::new(),
            InverseDepthConverter::default(),
            MockDisplay::new(),
            small_config(),
        )
        .unwrap();
        capture.shutdown().unwrap();
        assert!(matches!(capture.run(), Err(Error::SessionNotStarted)));
    }
}
