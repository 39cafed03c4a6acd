//! # Value Module
//!
//! This module defines the dynamic attribute value used by the record mapper.
//! A `Value` is what a record stores per field, what predicate clauses carry,
//! and what gets bound into parameterized statements or decoded out of result
//! rows. Equality on `Value` is structural, which is what drives the dirty
//! comparison in [`crate::record::Record`].
//!
//! ## Features
//!
//! - **Conversions**: `From` impls for the common Rust types, so call sites
//!   can pass plain literals (`record.set("age", 30)`)
//! - **Driver-Aware Binding**: temporal and UUID values are formatted per
//!   database driver before binding (see [`crate::temporal`])
//! - **Row Decoding**: result rows are decoded into field → `Value` maps by
//!   inspecting column type information

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, Serializer};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Arguments, Column, Row, TypeInfo, ValueRef};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::Drivers;
use crate::errors::Error;
use crate::temporal;

// ============================================================================
// Value Enum
// ============================================================================

/// A dynamically typed attribute value.
///
/// Records do not know their column layout at compile time; every attribute
/// is one of these. `PartialEq` is structural: `Value::Int(1) != Value::Text("1")`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value. All integer widths are widened to `i64`.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// UUID value, stored hyphenated on every driver.
    Uuid(Uuid),
    /// Timestamp with time zone, formatted per driver on binding.
    DateTime(DateTime<Utc>),
    /// Raw binary value.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns `true` for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer content, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float content, if this is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean content.
    ///
    /// Integer `0`/`1` is accepted as well, since SQLite reports booleans as
    /// integers through the `Any` driver.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            _ => None,
        }
    }

    /// Returns the text content, if this is a `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the UUID content, parsing `Text` storage representations.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(v) => Some(*v),
            Value::Text(v) => v.parse().ok(),
            _ => None,
        }
    }

    /// Returns the timestamp content, parsing `Text` storage representations.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(v) => Some(*v),
            Value::Text(v) => temporal::parse_datetime_utc(v).ok(),
            _ => None,
        }
    }

    /// Binds this value into an argument list, using driver-specific
    /// formatting where the storage representations differ.
    pub(crate) fn bind(&self, args: &mut AnyArguments<'_>, driver: Drivers) -> Result<(), Error> {
        let result = match self {
            Value::Null => args.add(Option::<String>::None),
            Value::Bool(v) => args.add(*v),
            Value::Int(v) => args.add(*v),
            Value::Float(v) => args.add(*v),
            Value::Text(v) => args.add(v.clone()),
            Value::Uuid(v) => args.add(v.hyphenated().to_string()),
            Value::DateTime(v) => args.add(temporal::format_datetime_for_driver(v, driver)),
            Value::Bytes(v) => args.add(v.clone()),
        };
        result.map_err(|e| Error::Conversion(format!("Failed to bind value: {e}")))
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

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
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
            Value::Uuid(v) => serializer.serialize_str(&v.hyphenated().to_string()),
            Value::DateTime(v) => serializer.serialize_str(&v.to_rfc3339()),
            Value::Bytes(v) => serializer.serialize_bytes(v),
        }
    }
}

// ============================================================================
// Row Decoding
// ============================================================================

/// Decodes one result row into a field → `Value` map.
///
/// Column types are taken from the driver's reported type info. Everything
/// the `Any` driver cannot classify decodes as text, which matches how the
/// mapper stores UUIDs and timestamps in the first place.
pub(crate) fn row_to_map(row: &AnyRow) -> Result<HashMap<String, Value>, Error> {
    let mut map = HashMap::with_capacity(row.columns().len());

    for (i, col) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = col.type_info().name().to_ascii_uppercase();
            if type_name.contains("BOOL") {
                Value::Bool(row.try_get(i)?)
            } else if type_name.contains("INT") {
                Value::Int(row.try_get(i)?)
            } else if ["REAL", "DOUBLE", "FLOAT", "NUMERIC", "DECIMAL"]
                .iter()
                .any(|t| type_name.contains(t))
            {
                Value::Float(row.try_get(i)?)
            } else if type_name.contains("BLOB") || type_name.contains("BYTEA") {
                Value::Bytes(row.try_get(i)?)
            } else {
                Value::Text(row.try_get(i)?)
            }
        };
        map.insert(col.name().to_string(), value);
    }

    Ok(map)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widths_widen_to_i64() {
        assert_eq!(Value::from(7_i8), Value::Int(7));
        assert_eq!(Value::from(7_i32), Value::Int(7));
        assert_eq!(Value::from(7_u32), Value::Int(7));
    }

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(Value::from(Option::<i32>::None), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_equality_is_structural() {
        assert_ne!(Value::Int(1), Value::Text("1".to_string()));
        assert_eq!(Value::Text("a".to_string()), Value::from("a"));
    }

    #[test]
    fn test_as_bool_accepts_integer_storage() {
        assert_eq!(Value::Int(1).as_bool(), Some(true));
        assert_eq!(Value::Int(0).as_bool(), Some(false));
        assert_eq!(Value::Int(2).as_bool(), None);
    }

    #[test]
    fn test_as_uuid_parses_text_storage() {
        let id = Uuid::new_v4();
        let stored = Value::Text(id.hyphenated().to_string());
        assert_eq!(stored.as_uuid(), Some(id));
    }

    #[test]
    fn test_serialize_to_json() {
        let json = serde_json::to_value(Value::Int(3)).unwrap();
        assert_eq!(json, serde_json::json!(3));
        let json = serde_json::to_value(Value::Null).unwrap();
        assert_eq!(json, serde_json::Value::Null);
    }
}
