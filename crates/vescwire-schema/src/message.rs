use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{Result, SchemaError};
use crate::field::{FieldSpec, MessageSchema};

/// A decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Numeric value as a float; `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    /// Integer value; floats round to the nearest integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() => Some(v.round() as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// An instance of a message schema with per-field values.
///
/// Fields start unset. A message packed with its body needs every field
/// set; a header-only request needs none.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    schema: MessageSchema,
    values: Vec<Option<Value>>,
}

impl Message {
    /// Empty message of the given kind.
    pub fn new(schema: MessageSchema) -> Self {
        Self {
            schema,
            values: vec![None; schema.fields.len()],
        }
    }

    /// Header-only getter request; packed with `header_only` set it is just the id byte.
    pub fn request(schema: MessageSchema) -> Self {
        Self::new(schema)
    }

    /// Message built from `(field, value)` pairs.
    pub fn with<I, K, V>(schema: MessageSchema, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut message = Self::new(schema);
        for (name, value) in values {
            message.set(name.as_ref(), value)?;
        }
        Ok(message)
    }

    /// Set a field by name.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let index = self
            .schema
            .field_index(field)
            .ok_or_else(|| SchemaError::UnknownField {
                schema: self.schema.name,
                field: field.to_owned(),
            })?;
        self.values[index] = Some(value.into());
        Ok(())
    }

    pub(crate) fn set_at(&mut self, index: usize, value: Value) {
        self.values[index] = Some(value);
    }

    pub(crate) fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema
            .field_index(field)
            .and_then(|index| self.value_at(index))
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn schema(&self) -> &MessageSchema {
        &self.schema
    }

    pub fn id(&self) -> u8 {
        self.schema.id
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    /// Field specs paired with their current values, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldSpec, Option<&Value>)> + '_ {
        self.schema
            .fields
            .iter()
            .zip(self.values.iter().map(Option::as_ref))
    }

    /// True when every field has a value.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (spec, value) in self.fields() {
            map.serialize_entry(spec.name, &value)?;
        }
        map.end()
    }
}
