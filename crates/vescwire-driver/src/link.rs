use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;
use vescwire_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use vescwire_transport::ByteStream;

use crate::error::Result;

const DRAIN_CHUNK_SIZE: usize = 256;
/// Most stale bytes dropped before a request goes out; anything past this is left to the reader.
const DRAIN_LIMIT: usize = 4096;

/// The stream plus its framing state. Every exchange happens under one lock.
pub(crate) struct Link {
    stream: Box<dyn ByteStream>,
    reader: FrameReader,
    writer: FrameWriter,
}

pub(crate) type SharedLink = Arc<Mutex<Link>>;

impl Link {
    pub(crate) fn shared(stream: Box<dyn ByteStream>, config: &FrameConfig) -> SharedLink {
        Arc::new(Mutex::new(Self {
            stream,
            reader: FrameReader::with_config(config.clone()),
            writer: FrameWriter::with_config(config.clone()),
        }))
    }

    /// Frame `payload` and write it in one call.
    pub(crate) fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.send(self.stream.as_mut(), payload)?;
        Ok(())
    }

    /// Write bytes that are already framed.
    pub(crate) fn write_raw(&mut self, wire: &[u8]) -> Result<()> {
        self.stream.write_all(wire).map_err(FrameError::from)?;
        Ok(())
    }

    pub(crate) fn read_frame(
        &mut self,
        deadline: Instant,
        min_buffered: usize,
    ) -> vescwire_frame::Result<Bytes> {
        self.reader
            .read_frame(self.stream.as_mut(), deadline, min_buffered)
    }

    /// Forget input left over from earlier exchanges, buffered or still pending on the stream.
    ///
    /// Draining stops at `deadline` or after [`DRAIN_LIMIT`] bytes, so a line
    /// that never goes quiet cannot hold the link.
    pub(crate) fn discard_input(&mut self, deadline: Instant) -> Result<()> {
        self.reader.clear();
        let mut scratch = [0u8; DRAIN_CHUNK_SIZE];
        let mut drained = 0;
        while drained < DRAIN_LIMIT && Instant::now() < deadline {
            let read = self
                .stream
                .read_available(&mut scratch, Duration::ZERO)
                .map_err(FrameError::from)?;
            if read == 0 {
                break;
            }
            drained += read;
        }
        if drained > 0 {
            trace!(len = drained, "discarded stale input");
        }
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.reader.clear();
        self.stream.close()?;
        Ok(())
    }
}

/// Lock the link, recovering from poisoning.
pub(crate) fn lock(link: &Mutex<Link>) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}
