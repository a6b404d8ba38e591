//! Client-side driver for the VESC motor controller serial protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte streams to the controller (TCP, Unix sockets)
//! - [`frame`]: packet framing, CRC and resynchronization
//! - [`schema`]: message layouts and field packing
//! - [`driver`]: the [`Vesc`] connection with keep-alive and typed commands
//!   (behind the `driver` feature)

/// Re-export transport types.
pub mod transport {
    pub use vescwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use vescwire_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use vescwire_schema::*;
}

/// Re-export driver types (requires `driver` feature).
#[cfg(feature = "driver")]
pub mod driver {
    pub use vescwire_driver::*;
}

#[cfg(feature = "driver")]
pub use vescwire_driver::{DriverConfig, DriverError, FirmwareVersion, Measurements, Vesc};
pub use vescwire_transport::Endpoint;
