use bytes::BytesMut;
use vescwire_transport::ByteStream;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Frames payloads and writes each one to a stream in a single call.
#[derive(Debug)]
pub struct FrameWriter {
    buf: BytesMut,
    config: FrameConfig,
}

impl FrameWriter {
    /// Create a new frame writer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode `payload` and write the whole frame (blocking).
    pub fn send<S>(&mut self, stream: &mut S, payload: &[u8]) -> Result<()>
    where
        S: ByteStream + ?Sized,
    {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        stream.write_all(&self.buf)?;
        Ok(())
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}
