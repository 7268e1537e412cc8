// Copyright (c) 2025 TensorDB Contributors
// Licensed under the TensorDB License. See LICENSE file for details.

//! Core data types for TensorDB.
//!
//! This module defines the data structures shared by the schema and query layers:
//! - [`FieldType`] - A field's declared type, scalar or tensor
//! - [`FieldMap`] - Ordered mapping from field name to [`FieldType`]
//! - [`Value`] - The tagged union for row values
//! - [`Row`] and [`Conditions`] - Ordered name-to-value maps

use std::fmt;

use indexmap::IndexMap;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::sql_types::ScalarType;
use crate::tensor::TensorDescriptor;

/// Name of the implicit primary key column of every collection.
pub const ID_FIELD: &str = "id";

/// Declared type of a field.
///
/// # Examples
///
/// ```rust
/// use tensordb::{FieldType, ScalarType};
/// use tensordb::tensor::{DType, TensorDescriptor};
///
/// let count = FieldType::from(ScalarType::Integer);
/// assert!(count.is_scalar());
///
/// let embedding = FieldType::from(
///     TensorDescriptor::from_dims(DType::Float32, &[Some(768)]).unwrap(),
/// );
/// assert!(embedding.as_tensor().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Scalar column typed through the type registry.
    Scalar(ScalarType),
    /// Tensor field, stored as an opaque reference column plus catalog metadata.
    Tensor(TensorDescriptor),
}

impl FieldType {
    /// Returns `true` for [`FieldType::Scalar`].
    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldType::Scalar(_))
    }

    /// Returns the scalar type if this is a scalar field.
    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar(scalar) => Some(*scalar),
            FieldType::Tensor(_) => None,
        }
    }

    /// Returns the descriptor if this is a tensor field.
    pub fn as_tensor(&self) -> Option<&TensorDescriptor> {
        match self {
            FieldType::Scalar(_) => None,
            FieldType::Tensor(desc) => Some(desc),
        }
    }
}

impl From<ScalarType> for FieldType {
    fn from(value: ScalarType) -> Self {
        FieldType::Scalar(value)
    }
}

impl From<TensorDescriptor> for FieldType {
    fn from(value: TensorDescriptor) -> Self {
        FieldType::Tensor(value)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(scalar) => write!(f, "{}", scalar),
            FieldType::Tensor(desc) => write!(f, "tensor<{}>", desc),
        }
    }
}

/// Ordered mapping from field name to field type.
///
/// Iteration follows insertion order; equality ignores it.
pub type FieldMap = IndexMap<String, FieldType>;

/// A row value.
///
/// Tensor fields hold a [`Value::Text`] opaque reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of value (SQL NULL).
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// UTF-8 string.
    Text(String),
}

impl Value {
    /// Returns the type name as a static string for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Text(_) => "Text",
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer if this is an [`Int`](Value::Int).
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float if this is a [`Float`](Value::Float).
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the string if this is a [`Text`](Value::Text).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if the value can be stored in a field of `field_type`.
    ///
    /// `Null` fits every field. Integers are accepted by float fields, as
    /// SQLite stores them losslessly in a `REAL` column.
    pub fn fits(&self, field_type: &FieldType) -> bool {
        match (self, field_type) {
            (Value::Null, _) => true,
            (Value::Int(_), FieldType::Scalar(ScalarType::Integer)) => true,
            (Value::Int(_) | Value::Float(_), FieldType::Scalar(ScalarType::Float64)) => true,
            (Value::Text(_), FieldType::Scalar(ScalarType::Text)) => true,
            (Value::Text(_), FieldType::Tensor(_)) => true,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Int(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Value::Null),
            ValueRef::Integer(i) => Ok(Value::Int(i)),
            ValueRef::Real(f) => Ok(Value::Float(f)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|s| Value::Text(s.to_string()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// A row keyed by field name, in output field order.
pub type Row = IndexMap<String, Value>;

/// Equality conditions keyed by field name, in predicate order.
pub type Conditions = IndexMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DType;

    #[test]
    fn test_field_map_equality_ignores_order() {
        let mut a = FieldMap::new();
        a.insert("x".to_string(), ScalarType::Integer.into());
        a.insert("y".to_string(), ScalarType::Text.into());

        let mut b = FieldMap::new();
        b.insert("y".to_string(), ScalarType::Text.into());
        b.insert("x".to_string(), ScalarType::Integer.into());

        assert_eq!(a, b);
    }

    #[test]
    fn test_field_type_display() {
        let tensor = TensorDescriptor::from_dims(DType::Int32, &[None, Some(2)]).unwrap();
        assert_eq!(FieldType::from(ScalarType::Float64).to_string(), "float64");
        assert_eq!(FieldType::from(tensor).to_string(), "tensor<int32[?, 2]>");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(7i64), Value::Int(7));
        assert_eq!(Value::from(7i32), Value::Int(7));
        assert_eq!(Value::from(1.5), Value::Float(1.5));
        assert_eq!(Value::from("a"), Value::Text("a".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("b")), Value::Text("b".to_string()));
    }

    #[test]
    fn test_value_fits() {
        let int = FieldType::Scalar(ScalarType::Integer);
        let float = FieldType::Scalar(ScalarType::Float64);
        let text = FieldType::Scalar(ScalarType::Text);
        let tensor = FieldType::Tensor(
            TensorDescriptor::from_dims(DType::Float32, &[Some(3)]).unwrap(),
        );

        assert!(Value::Int(1).fits(&int));
        assert!(Value::Int(1).fits(&float));
        assert!(!Value::Float(1.0).fits(&int));
        assert!(!Value::Int(1).fits(&text));
        assert!(Value::Text("ref".into()).fits(&tensor));
        assert!(!Value::Float(1.0).fits(&tensor));
        for field_type in [&int, &float, &text, &tensor] {
            assert!(Value::Null.fits(field_type));
        }
    }

    #[test]
    fn test_value_sql_roundtrip() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for value in [
            Value::Null,
            Value::Int(-3),
            Value::Float(2.5),
            Value::Text("hello".to_string()),
        ] {
            let back: Value = conn
                .query_row("SELECT ?1", [&value], |row| row.get(0))
                .unwrap();
            assert_eq!(back, value);
        }
    }
}
