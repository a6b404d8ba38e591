//! Byte-stream abstraction for VESC serial links.
//!
//! The protocol layers above only need a duplex channel that can be
//! written to and polled for input with a timeout. [`ByteStream`] is that
//! contract; [`IoStream`] implements it over std TCP and Unix domain
//! sockets, which is how a serial line is usually bridged (ser2net,
//! socat, a USB-serial gateway).
//!
//! Opening and configuring a physical tty is left to the caller: anything
//! that implements [`ByteStream`] can drive a controller.

pub mod endpoint;
pub mod error;
pub mod traits;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use traits::{ByteStream, IoStream};
