// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured event record and its typed user fields.
//!
//! The wire encoding is protocol buffers; the structs below are the
//! hand-maintained prost model (no codegen step). Field names within a
//! message are not unique; lookups take an occurrence index.

use thiserror::Error;
use uuid::Uuid;

/// Byte length of a message UUID.
pub const UUID_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("uuid must be exactly {UUID_SIZE} bytes, got {0}")]
    BadUuid(usize),
    #[error("field {name:?} holds {have:?} values, cannot append {got:?}")]
    ValueTypeMismatch { name: String, have: ValueType, got: ValueType },
}

/// One telemetry event.
///
/// `timestamp` is nanoseconds since the Unix epoch. `severity` is
/// syslog-style (0 emergency .. 7 debug) and defaults to 7.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(bytes = "vec", tag = "1")]
    pub uuid: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
    #[prost(string, optional, tag = "3")]
    pub msg_type: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub logger: Option<String>,
    #[prost(int32, optional, tag = "5", default = "7")]
    pub severity: Option<i32>,
    #[prost(string, optional, tag = "6")]
    pub payload: Option<String>,
    #[prost(string, optional, tag = "7")]
    pub env_version: Option<String>,
    #[prost(int32, optional, tag = "8")]
    pub pid: Option<i32>,
    #[prost(string, optional, tag = "9")]
    pub hostname: Option<String>,
    #[prost(message, repeated, tag = "10")]
    pub fields: Vec<Field>,
}

/// A named, typed user field. Scalar values are single-element arrays.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Field {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(enumeration = "ValueType", optional, tag = "2")]
    pub value_type: Option<i32>,
    #[prost(string, optional, tag = "3")]
    pub representation: Option<String>,
    #[prost(string, repeated, tag = "4")]
    pub value_string: Vec<String>,
    #[prost(bytes = "vec", repeated, tag = "5")]
    pub value_bytes: Vec<Vec<u8>>,
    #[prost(int64, repeated, packed = "true", tag = "6")]
    pub value_integer: Vec<i64>,
    #[prost(double, repeated, packed = "true", tag = "7")]
    pub value_double: Vec<f64>,
    #[prost(bool, repeated, packed = "true", tag = "8")]
    pub value_bool: Vec<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum ValueType {
    String = 0,
    Bytes = 1,
    Integer = 2,
    Double = 3,
    Bool = 4,
}

/// Owned field value, used when constructing fields.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Bytes(Vec<u8>),
    Integer(i64),
    Double(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            FieldValue::String(_) => ValueType::String,
            FieldValue::Bytes(_) => ValueType::Bytes,
            FieldValue::Integer(_) => ValueType::Integer,
            FieldValue::Double(_) => ValueType::Double,
            FieldValue::Bool(_) => ValueType::Bool,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// Borrowed view of one value inside a field's value array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    String(&'a str),
    Bytes(&'a [u8]),
    Integer(i64),
    Double(f64),
    Bool(bool),
}

impl Message {
    /// New message with a fresh v4 UUID and zero timestamp.
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().as_bytes().to_vec(),
            msg_type: Some(msg_type.into()),
            ..Default::default()
        }
    }

    /// The UUID in hyphenated string form, if the raw bytes are valid.
    pub fn uuid_hyphenated(&self) -> Option<String> {
        Uuid::from_slice(&self.uuid).ok().map(|u| u.hyphenated().to_string())
    }

    pub fn set_uuid(&mut self, bytes: &[u8]) -> Result<(), MessageError> {
        if bytes.len() != UUID_SIZE {
            return Err(MessageError::BadUuid(bytes.len()));
        }
        self.uuid = bytes.to_vec();
        Ok(())
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// First occurrence of the named field.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_nth(name, 0)
    }

    /// Nth occurrence (0-based) of the named field.
    pub fn field_nth(&self, name: &str, occurrence: usize) -> Option<&Field> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .nth(occurrence)
    }
}

impl Field {
    /// New field holding a single value.
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let mut field = Self {
            name: name.into(),
            ..Default::default()
        };
        let value = value.into();
        field.value_type = Some(value.value_type() as i32);
        field.push_unchecked(value);
        field
    }

    pub fn with_representation(mut self, representation: impl Into<String>) -> Self {
        self.representation = Some(representation.into());
        self
    }

    /// Append a value of the same type as the existing values.
    pub fn push(&mut self, value: impl Into<FieldValue>) -> Result<(), MessageError> {
        let value = value.into();
        let have = self.kind();
        if value.value_type() != have {
            return Err(MessageError::ValueTypeMismatch {
                name: self.name.clone(),
                have,
                got: value.value_type(),
            });
        }
        self.push_unchecked(value);
        Ok(())
    }

    fn push_unchecked(&mut self, value: FieldValue) {
        match value {
            FieldValue::String(v) => self.value_string.push(v),
            FieldValue::Bytes(v) => self.value_bytes.push(v),
            FieldValue::Integer(v) => self.value_integer.push(v),
            FieldValue::Double(v) => self.value_double.push(v),
            FieldValue::Bool(v) => self.value_bool.push(v),
        }
    }

    /// The declared value type (STRING when the tag is absent or unknown).
    pub fn kind(&self) -> ValueType {
        self.value_type
            .and_then(|t| ValueType::try_from(t).ok())
            .unwrap_or(ValueType::String)
    }

    /// Number of values in this field's array.
    pub fn value_count(&self) -> usize {
        match self.kind() {
            ValueType::String => self.value_string.len(),
            ValueType::Bytes => self.value_bytes.len(),
            ValueType::Integer => self.value_integer.len(),
            ValueType::Double => self.value_double.len(),
            ValueType::Bool => self.value_bool.len(),
        }
    }

    /// Borrowed view of the value at `idx` within the array.
    pub fn value_at(&self, idx: usize) -> Option<ValueRef<'_>> {
        match self.kind() {
            ValueType::String => self.value_string.get(idx).map(|v| ValueRef::String(v)),
            ValueType::Bytes => self.value_bytes.get(idx).map(|v| ValueRef::Bytes(v)),
            ValueType::Integer => self.value_integer.get(idx).copied().map(ValueRef::Integer),
            ValueType::Double => self.value_double.get(idx).copied().map(ValueRef::Double),
            ValueType::Bool => self.value_bool.get(idx).copied().map(ValueRef::Bool),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
