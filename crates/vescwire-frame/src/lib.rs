//! CRC-protected packet framing for the VESC serial protocol.
//!
//! Every payload on the wire is wrapped as:
//! - a start byte: `0x02` for payloads up to 255 bytes, `0x03` above that
//! - a 1-byte (short) or 2-byte big-endian (long) payload length
//! - the payload itself
//! - a CRC-16/XMODEM of the payload, big-endian
//! - the end byte `0x03`
//!
//! The stream does not self-synchronize, so decoding scans for start
//! bytes, waits for partial frames and skips candidates whose CRC or end
//! byte is wrong.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    crc16, encode_frame, frame, scan_frame, scan_frame_with_limit, unframe, wire_size,
    Corruption, FrameConfig, Scan, END_BYTE, LONG_START, MAX_PAYLOAD, MAX_SHORT_PAYLOAD,
    SHORT_START,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
