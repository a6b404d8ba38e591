//! Declarative message schemas and field packing for the VESC serial protocol.
//!
//! A payload is a 1-byte message id followed by the message's fields in
//! schema order, integers big-endian. Real-valued fields travel as
//! fixed-point integers: a field with scale `s` carries `round(v × s)`.
//!
//! Schemas are plain `const` tables ([`catalog`]); decoding dispatches on
//! the id through a [`SchemaCatalog`] built per connection, so the
//! firmware-dependent GET_VALUES layout is chosen once and passed around
//! explicitly.

pub mod catalog;
pub mod error;
pub mod field;
pub mod ids;
pub mod message;
pub mod packer;

pub use catalog::{FieldSet, SchemaCatalog};
pub use error::{Result, SchemaError};
pub use field::{FieldKind, FieldSpec, MessageSchema};
pub use message::{Message, Value};
pub use packer::{pack, unpack};
