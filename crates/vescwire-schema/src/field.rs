use std::fmt;

use crate::error::{Result, SchemaError};

/// Wire representation of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Signed 8-bit integer.
    Int8,
    /// Signed 16-bit integer, big-endian.
    Int16,
    /// Signed 32-bit integer, big-endian.
    Int32,
    /// Real value carried as a scaled signed 32-bit integer; always decodes to a float.
    Float32,
    /// Raw bytes up to the end of the payload; only valid as the last field.
    Str,
}

impl FieldKind {
    /// Encoded width in bytes, or `None` for the unbounded string kind.
    pub const fn width(self) -> Option<usize> {
        match self {
            FieldKind::Int8 => Some(1),
            FieldKind::Int16 => Some(2),
            FieldKind::Int32 | FieldKind::Float32 => Some(4),
            FieldKind::Str => None,
        }
    }

    /// Inclusive raw integer range, or `None` for the string kind.
    pub const fn raw_range(self) -> Option<(i64, i64)> {
        match self {
            FieldKind::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            FieldKind::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            FieldKind::Int32 | FieldKind::Float32 => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldKind::Str => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        !matches!(self, FieldKind::Str)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Int8 => "int8",
            FieldKind::Int16 => "int16",
            FieldKind::Int32 => "int32",
            FieldKind::Float32 => "float32",
            FieldKind::Str => "string",
        };
        f.write_str(name)
    }
}

/// One named, typed field of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Fixed-point multiplier; `None` stores the raw integer.
    pub scale: Option<u32>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            scale: None,
        }
    }

    pub const fn int8(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int8)
    }

    pub const fn int16(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int16)
    }

    pub const fn int32(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int32)
    }

    pub const fn float32(name: &'static str) -> Self {
        Self::new(name, FieldKind::Float32)
    }

    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::Str)
    }

    /// Attach a fixed-point scale factor.
    pub const fn scaled(self, scale: u32) -> Self {
        Self {
            scale: Some(scale),
            ..self
        }
    }

    /// Scale used for conversion; float fields default to 1 and always convert.
    pub fn conversion_scale(&self) -> Option<f64> {
        match (self.kind, self.scale) {
            (_, Some(scale)) => Some(f64::from(scale)),
            (FieldKind::Float32, None) => Some(1.0),
            _ => None,
        }
    }
}

/// Id and ordered field layout of one message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSchema {
    pub id: u8,
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl MessageSchema {
    pub const fn new(id: u8, name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { id, name, fields }
    }

    /// Encoded payload length (id byte + fields), or `None` if a string field makes it variable.
    pub fn fixed_len(&self) -> Option<usize> {
        self.fields
            .iter()
            .try_fold(1usize, |len, field| Some(len + field.kind.width()?))
    }

    /// Position of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Check layout rules: one trailing string at most, non-zero scales, unique names.
    pub fn validate(&self) -> Result<()> {
        let last = self.fields.len().saturating_sub(1);
        for (index, field) in self.fields.iter().enumerate() {
            if field.kind == FieldKind::Str && index != last {
                return Err(SchemaError::InvalidSchema {
                    schema: self.name,
                    reason: "string field must be the last field",
                });
            }
            if field.kind == FieldKind::Str && field.scale.is_some() {
                return Err(SchemaError::InvalidSchema {
                    schema: self.name,
                    reason: "string field cannot be scaled",
                });
            }
            if field.scale == Some(0) {
                return Err(SchemaError::InvalidSchema {
                    schema: self.name,
                    reason: "scale factor must be non-zero",
                });
            }
            if self.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::InvalidSchema {
                    schema: self.name,
                    reason: "duplicate field name",
                });
            }
        }
        Ok(())
    }
}
