use std::fmt;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use crc::{Crc, CRC_16_XMODEM};

use crate::error::{FrameError, Result};

/// Start byte of a frame whose payload fits in a 1-byte length.
pub const SHORT_START: u8 = 0x02;

/// Start byte of a frame carrying a 2-byte big-endian length.
pub const LONG_START: u8 = 0x03;

/// Fixed end byte of every frame.
pub const END_BYTE: u8 = 0x03;

/// Largest payload carried with a short header.
pub const MAX_SHORT_PAYLOAD: usize = u8::MAX as usize;

/// Largest payload the 2-byte length can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

const SHORT_HEADER_SIZE: usize = 2;
const LONG_HEADER_SIZE: usize = 3;

/// CRC (2) + end byte (1).
const TRAILER_SIZE: usize = 3;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC-16/XMODEM (poly 0x1021, init 0) over the payload bytes.
pub fn crc16(payload: &[u8]) -> u16 {
    CRC16.checksum(payload)
}

/// Total bytes on the wire for a payload of `payload_len` bytes.
pub fn wire_size(payload_len: usize) -> usize {
    header_size(payload_len) + payload_len + TRAILER_SIZE
}

fn header_size(payload_len: usize) -> usize {
    if payload_len <= MAX_SHORT_PAYLOAD {
        SHORT_HEADER_SIZE
    } else {
        LONG_HEADER_SIZE
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// short: ┌──────┬─────────┬──────────────┬────────────┬──────┐
///        │ 0x02 │ len (1) │ payload      │ CRC (2 BE) │ 0x03 │
///        └──────┴─────────┴──────────────┴────────────┴──────┘
/// long:  ┌──────┬────────────┬───────────┬────────────┬──────┐
///        │ 0x03 │ len (2 BE) │ payload   │ CRC (2 BE) │ 0x03 │
///        └──────┴────────────┴───────────┴────────────┴──────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(wire_size(payload.len()));
    if payload.len() <= MAX_SHORT_PAYLOAD {
        dst.put_u8(SHORT_START);
        dst.put_u8(payload.len() as u8);
    } else {
        dst.put_u8(LONG_START);
        dst.put_u16(payload.len() as u16);
    }
    dst.put_slice(payload);
    dst.put_u16(crc16(payload));
    dst.put_u8(END_BYTE);
    Ok(())
}

/// Encode a payload into a freshly allocated frame.
pub fn frame(payload: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(wire_size(payload.len()));
    encode_frame(payload, &mut dst)?;
    Ok(dst.freeze())
}

/// Why a candidate frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// The trailing CRC does not match the payload.
    CrcMismatch { expected: u16, actual: u16 },
    /// The byte after the CRC is not [`END_BYTE`].
    BadEndMarker(u8),
    /// A long header declared a length that fits a short header.
    NonCanonicalLength(usize),
    /// The declared length exceeds the configured maximum.
    Oversized { len: usize, max: usize },
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::CrcMismatch { expected, actual } => {
                write!(f, "crc mismatch (frame {expected:#06x}, computed {actual:#06x})")
            }
            Corruption::BadEndMarker(byte) => write!(f, "bad end marker {byte:#04x}"),
            Corruption::NonCanonicalLength(len) => {
                write!(f, "long header declares short length {len}")
            }
            Corruption::Oversized { len, max } => {
                write!(f, "declared length {len} exceeds max {max}")
            }
        }
    }
}

/// Outcome of scanning a buffer for the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<'a> {
    /// A valid frame. `consumed` counts any garbage before its start byte.
    Frame { payload: &'a [u8], consumed: usize },
    /// A start byte at `skip` whose frame is not fully buffered yet.
    Incomplete { skip: usize },
    /// The candidate starting at `skip - 1` is not a valid frame.
    Corrupt { skip: usize, reason: Corruption },
    /// No start byte anywhere in the buffer.
    NoMarker,
}

/// Scan `buf` for the first frame, allowing payloads up to [`MAX_PAYLOAD`].
pub fn scan_frame(buf: &[u8]) -> Scan<'_> {
    scan_frame_with_limit(buf, MAX_PAYLOAD)
}

/// Scan `buf` for the first frame, rejecting declared lengths above `max_payload`.
pub fn scan_frame_with_limit(buf: &[u8], max_payload: usize) -> Scan<'_> {
    let Some(start) = buf
        .iter()
        .position(|&b| b == SHORT_START || b == LONG_START)
    else {
        return Scan::NoMarker;
    };
    let rest = &buf[start..];

    let (header, len) = if rest[0] == SHORT_START {
        if rest.len() < SHORT_HEADER_SIZE {
            return Scan::Incomplete { skip: start };
        }
        (SHORT_HEADER_SIZE, rest[1] as usize)
    } else {
        if rest.len() < LONG_HEADER_SIZE {
            return Scan::Incomplete { skip: start };
        }
        let len = u16::from_be_bytes([rest[1], rest[2]]) as usize;
        if len <= MAX_SHORT_PAYLOAD {
            return Scan::Corrupt {
                skip: start + 1,
                reason: Corruption::NonCanonicalLength(len),
            };
        }
        (LONG_HEADER_SIZE, len)
    };

    if len > max_payload {
        return Scan::Corrupt {
            skip: start + 1,
            reason: Corruption::Oversized {
                len,
                max: max_payload,
            },
        };
    }

    let total = header + len + TRAILER_SIZE;
    if rest.len() < total {
        return Scan::Incomplete { skip: start };
    }

    let payload = &rest[header..header + len];
    let expected = u16::from_be_bytes([rest[header + len], rest[header + len + 1]]);
    let end = rest[total - 1];

    if end != END_BYTE {
        return Scan::Corrupt {
            skip: start + 1,
            reason: Corruption::BadEndMarker(end),
        };
    }

    let actual = crc16(payload);
    if actual != expected {
        return Scan::Corrupt {
            skip: start + 1,
            reason: Corruption::CrcMismatch { expected, actual },
        };
    }

    Scan::Frame {
        payload,
        consumed: start + total,
    }
}

/// Extract the next payload from `buf`.
///
/// Returns `(Some(payload), consumed)` for a valid frame. A corrupt
/// candidate yields `(None, n)` with `n` just past its start byte so the
/// next call resynchronizes on a later candidate. A partial frame or a
/// buffer with no start byte yields `(None, 0)`: nothing is consumed.
pub fn unframe(buf: &[u8]) -> (Option<&[u8]>, usize) {
    match scan_frame(buf) {
        Scan::Frame { payload, consumed } => (Some(payload), consumed),
        Scan::Corrupt { skip, .. } => (None, skip),
        Scan::Incomplete { .. } | Scan::NoMarker => (None, 0),
    }
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 65535.
    pub max_payload_size: usize,
    /// Longest single wait on the stream while a frame is pending.
    pub poll_interval: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD,
            poll_interval: Duration::from_millis(5),
        }
    }
}
