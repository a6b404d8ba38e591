use std::time::Instant;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{trace, warn};
use vescwire_transport::ByteStream;

use crate::codec::{scan_frame_with_limit, FrameConfig, Scan};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 512;
const TRAILER_SIZE: usize = 3;

/// Extracts complete frames from a byte stream.
///
/// Bytes that do not belong to a valid frame (line noise, a response to an
/// abandoned request, a false start byte) are dropped as the scan moves
/// past them. Partial frames stay buffered until the rest arrives.
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    config: FrameConfig,
    corrupt_frames: u64,
}

enum Step {
    Frame { consumed: usize, len: usize },
    Wait { skip: usize },
    Skip { skip: usize },
    Discard,
}

impl FrameReader {
    /// Create a frame reader with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a frame reader with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            corrupt_frames: 0,
        }
    }

    /// Append raw bytes received from the wire.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything buffered, e.g. before issuing a fresh request.
    pub fn clear(&mut self) {
        if !self.buf.is_empty() {
            trace!(len = self.buf.len(), "discarding stale input");
        }
        self.buf.clear();
    }

    /// Total corrupt candidates skipped so far.
    pub fn corrupt_frames(&self) -> u64 {
        self.corrupt_frames
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Pop the next complete payload already in the buffer, if any.
    pub fn next_buffered(&mut self) -> Option<Bytes> {
        loop {
            let step = match scan_frame_with_limit(&self.buf, self.config.max_payload_size) {
                Scan::Frame { payload, consumed } => Step::Frame {
                    consumed,
                    len: payload.len(),
                },
                Scan::Incomplete { skip } if self.complete_frame_after(skip) => {
                    // A later frame is already whole, so this start byte was noise
                    // (typically the end byte of a rejected frame).
                    trace!(offset = skip, "skipping false start byte");
                    Step::Skip { skip: skip + 1 }
                }
                Scan::Incomplete { skip } => Step::Wait { skip },
                Scan::Corrupt { skip, reason } => {
                    warn!(%reason, "discarding corrupt frame");
                    Step::Skip { skip }
                }
                Scan::NoMarker => Step::Discard,
            };

            match step {
                Step::Frame { consumed, len } => {
                    let mut frame = self.buf.split_to(consumed);
                    frame.truncate(consumed - TRAILER_SIZE);
                    frame.advance(consumed - TRAILER_SIZE - len);
                    return Some(frame.freeze());
                }
                Step::Wait { skip } => {
                    self.buf.advance(skip);
                    return None;
                }
                Step::Skip { skip } => {
                    self.corrupt_frames += 1;
                    self.buf.advance(skip);
                }
                Step::Discard => {
                    if !self.buf.is_empty() {
                        trace!(len = self.buf.len(), "dropping bytes without start marker");
                    }
                    self.buf.clear();
                    return None;
                }
            }
        }
    }

    fn complete_frame_after(&self, skip: usize) -> bool {
        let mut offset = skip + 1;
        while offset < self.buf.len() {
            match scan_frame_with_limit(&self.buf[offset..], self.config.max_payload_size) {
                Scan::Frame { .. } => return true,
                Scan::Corrupt { skip, .. } => offset += skip,
                Scan::Incomplete { skip } => offset += skip + 1,
                Scan::NoMarker => return false,
            }
        }
        false
    }

    /// Read the next complete frame payload (blocking until `deadline`).
    ///
    /// No scan is attempted until at least `min_buffered` bytes are
    /// buffered. Corrupt and partial frames are retried by polling the
    /// stream in `poll_interval` slices; running out of time yields
    /// [`FrameError::Timeout`] and leaves any partial frame buffered.
    pub fn read_frame<S>(
        &mut self,
        stream: &mut S,
        deadline: Instant,
        min_buffered: usize,
    ) -> Result<Bytes>
    where
        S: ByteStream + ?Sized,
    {
        loop {
            if self.buf.len() >= min_buffered {
                if let Some(payload) = self.next_buffered() {
                    return Ok(payload);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(FrameError::Timeout);
            }
            let wait = (deadline - now).min(self.config.poll_interval);

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = stream.read_available(&mut chunk, wait)?;
            if read > 0 {
                trace!(len = read, "received bytes");
                self.buf.extend_from_slice(&chunk[..read]);
            }
        }
    }

    /// Update maximum payload size for subsequent frame extraction.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use vescwire_transport::TransportError;

    use super::*;
    use crate::codec::frame;

    /// Hands out scripted chunks, one per read, then times out.
    struct ScriptedStream {
        chunks: VecDeque<Vec<u8>>,
        close_when_drained: bool,
    }

    impl ScriptedStream {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: chunks.into(),
                close_when_drained: false,
            }
        }
    }

    impl ByteStream for ScriptedStream {
        fn write_all(&mut self, _data: &[u8]) -> vescwire_transport::Result<()> {
            Ok(())
        }

        fn read_available(
            &mut self,
            buf: &mut [u8],
            timeout: Duration,
        ) -> vescwire_transport::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None if self.close_when_drained => Err(TransportError::Closed),
                None => {
                    std::thread::sleep(timeout);
                    Ok(0)
                }
            }
        }

        fn close(&mut self) -> vescwire_transport::Result<()> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    fn deadline_in(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[test]
    fn reads_frame_split_across_chunks() {
        let wire = frame(b"\x00\x05\x02").unwrap();
        let chunks = wire.chunks(2).map(<[u8]>::to_vec).collect();
        let mut stream = ScriptedStream::new(chunks);

        let mut reader = FrameReader::new();
        let payload = reader
            .read_frame(&mut stream, deadline_in(500), 0)
            .unwrap();
        assert_eq!(payload.as_ref(), b"\x00\x05\x02");
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn skips_garbage_and_corrupt_frames() {
        let mut corrupt = frame(b"\x04bad").unwrap().to_vec();
        corrupt[3] ^= 0x01;

        let mut wire = vec![0xFF, 0x55];
        wire.extend_from_slice(&corrupt);
        wire.extend_from_slice(&frame(b"\x04good").unwrap());

        let mut stream = ScriptedStream::new(vec![wire]);
        let mut reader = FrameReader::new();
        let payload = reader
            .read_frame(&mut stream, deadline_in(500), 0)
            .unwrap();

        assert_eq!(payload.as_ref(), b"\x04good");
        assert!(reader.corrupt_frames() >= 1);
    }

    #[test]
    fn false_long_start_does_not_stall_valid_frame() {
        // 0x03 0x02 0x05 reads as a long header declaring 517 bytes.
        let mut wire = vec![0x03];
        wire.extend_from_slice(&frame(&[0x05, 0x11, 0x12, 0x13, 0x14]).unwrap());
        assert_eq!(&wire[..3], &[0x03, 0x02, 0x05]);

        let mut stream = ScriptedStream::new(vec![wire]);
        let mut reader = FrameReader::new();
        let payload = reader
            .read_frame(&mut stream, deadline_in(500), 0)
            .unwrap();
        assert_eq!(payload.as_ref(), &[0x05, 0x11, 0x12, 0x13, 0x14]);
    }

    #[test]
    fn keeps_trailing_bytes_for_next_frame() {
        let mut wire = frame(b"\x1E").unwrap().to_vec();
        wire.extend_from_slice(&frame(b"\x00\x05\x02").unwrap());

        let mut stream = ScriptedStream::new(vec![wire]);
        let mut reader = FrameReader::new();

        let first = reader
            .read_frame(&mut stream, deadline_in(500), 0)
            .unwrap();
        let second = reader
            .read_frame(&mut stream, deadline_in(500), 0)
            .unwrap();
        assert_eq!(first.as_ref(), b"\x1E");
        assert_eq!(second.as_ref(), b"\x00\x05\x02");
    }

    #[test]
    fn waits_for_minimum_before_scanning() {
        let wire = frame(b"\x1E").unwrap();
        let mut stream = ScriptedStream::new(vec![wire.to_vec()]);
        let mut reader = FrameReader::new();

        let err = reader
            .read_frame(&mut stream, deadline_in(30), wire.len() + 1)
            .unwrap_err();
        assert!(matches!(err, FrameError::Timeout));
        assert_eq!(reader.buffered(), wire.len());
        assert_eq!(reader.next_buffered().unwrap().as_ref(), b"\x1E");
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let wire = frame(b"\x04partial").unwrap();
        let mut stream = ScriptedStream::new(vec![wire[..5].to_vec()]);
        let mut reader = FrameReader::new();

        let err = reader
            .read_frame(&mut stream, deadline_in(30), 0)
            .unwrap_err();
        assert!(matches!(err, FrameError::Timeout));
        assert_eq!(reader.buffered(), 5);

        reader.extend_from_slice(&wire[5..]);
        assert_eq!(reader.next_buffered().unwrap().as_ref(), b"\x04partial");
    }

    #[test]
    fn closed_stream_is_reported() {
        let mut stream = ScriptedStream::new(vec![vec![0x02, 0x09]]);
        stream.close_when_drained = true;
        let mut reader = FrameReader::new();

        let err = reader
            .read_frame(&mut stream, deadline_in(500), 0)
            .unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn clear_discards_stale_input() {
        let mut reader = FrameReader::new();
        reader.extend_from_slice(&frame(b"\x1E").unwrap());
        reader.clear();
        assert_eq!(reader.buffered(), 0);
        assert!(reader.next_buffered().is_none());
    }

    #[test]
    fn max_payload_rejects_large_declarations() {
        let payload = vec![0x11; 300];
        let mut reader = FrameReader::new();
        reader.set_max_payload_size(256);
        reader.extend_from_slice(&frame(&payload).unwrap());

        assert!(reader.next_buffered().is_none());
        assert!(reader.corrupt_frames() >= 1);
    }
}
