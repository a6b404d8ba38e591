//! Blocking driver for a VESC motor controller.
//!
//! A [`Vesc`] owns one byte stream. Commands are packed, framed and
//! written; queries additionally wait (bounded by
//! [`DriverConfig::response_timeout`]) for the matching response frame. A
//! background keep-alive thread writes ALIVE frames so the controller does
//! not time out while a command should stay in effect.

mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod firmware;
mod heartbeat;
mod link;
pub mod measurements;

pub use commands::RotorPositionMode;
pub use config::DriverConfig;
pub use connection::{ConnectionState, Vesc};
pub use error::{DriverError, Result};
pub use firmware::FirmwareVersion;
pub use measurements::Measurements;
