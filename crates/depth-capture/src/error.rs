use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("depth device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("stream configuration rejected: {0}")]
    StreamConfigRejected(String),
    #[error("timed out waiting for a frame")]
    FrameTimeout,
    #[error("sensor session not started")]
    SessionNotStarted,
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
