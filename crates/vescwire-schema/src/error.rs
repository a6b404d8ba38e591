use crate::field::FieldKind;

/// Errors that can occur while building, packing or unpacking messages.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The payload's id byte has no registered schema.
    #[error("unknown message id {0}")]
    UnknownMessageId(u8),

    /// The payload has no id byte at all.
    #[error("malformed payload: empty")]
    EmptyPayload,

    /// The payload ends before the schema's fields do.
    #[error(
        "malformed {schema} payload: field '{field}' needs {needed} bytes, {available} left"
    )]
    MalformedPayload {
        schema: &'static str,
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A field was left unset on a message packed with its body.
    #[error("field '{0}' is not set")]
    FieldMissing(&'static str),

    /// A value does not fit its field width once scaled.
    #[error("field '{field}' value {value} does not fit {kind} after scaling")]
    FieldRange {
        field: &'static str,
        value: f64,
        kind: FieldKind,
    },

    /// A value has the wrong shape for its field (text vs. number).
    #[error("field '{field}' expects {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    /// The schema has no field by that name.
    #[error("{schema} has no field '{field}'")]
    UnknownField { schema: &'static str, field: String },

    /// Two schemas claim the same id.
    #[error("message id {id} already registered as {existing}")]
    DuplicateId { id: u8, existing: &'static str },

    /// The schema itself breaks a layout rule.
    #[error("invalid schema {schema}: {reason}")]
    InvalidSchema {
        schema: &'static str,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
