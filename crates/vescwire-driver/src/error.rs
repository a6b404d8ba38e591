use std::time::Duration;

use vescwire_frame::FrameError;

/// Errors that can occur while talking to a controller.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Transport-level error, including failure to connect.
    #[error("transport error: {0}")]
    Transport(#[from] vescwire_transport::TransportError),

    /// Frame-level error other than timeouts and disconnects.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// A response payload could not be decoded, or a command could not be encoded.
    #[error("schema error: {0}")]
    Schema(#[from] vescwire_schema::SchemaError),

    /// No complete response arrived in time. The connection stays usable.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The device side closed the stream.
    #[error("connection lost")]
    ConnectionLost,

    /// The connection was closed locally.
    #[error("connection is closed")]
    Closed,

    /// The firmware reported a version this driver cannot interpret.
    #[error("invalid firmware version: {0}")]
    InvalidFirmwareVersion(String),

    /// The keep-alive thread could not be started.
    #[error("failed to start heartbeat: {0}")]
    Heartbeat(#[source] std::io::Error),
}

impl From<FrameError> for DriverError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::ConnectionClosed => DriverError::ConnectionLost,
            FrameError::Transport(err) => DriverError::Transport(err),
            other => DriverError::Frame(other),
        }
    }
}

impl DriverError {
    /// Map a frame read failure, attaching the wait bound to timeouts.
    pub(crate) fn from_read(err: FrameError, waited: Duration) -> Self {
        match err {
            FrameError::Timeout => DriverError::Timeout(waited),
            other => other.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
