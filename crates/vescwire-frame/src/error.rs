use vescwire_transport::TransportError;

/// Errors that can occur during frame encoding or extraction.
///
/// Corrupt candidates are not errors: the reader skips them and keeps
/// scanning (see [`crate::Corruption`]).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured or protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// No complete, valid frame arrived before the deadline.
    #[error("timed out waiting for a complete frame")]
    Timeout,

    /// The stream was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// The underlying transport failed.
    #[error("frame transport error: {0}")]
    Transport(TransportError),
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => FrameError::ConnectionClosed,
            other => FrameError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
