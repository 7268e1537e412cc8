//! Type registry between scalar field types and SQLite column types.
//!
//! The mapping is a fixed bijection:
//!
//! | [`ScalarType`] | [`StorageType`] |
//! |----------------|-----------------|
//! | `Integer`      | `INTEGER`       |
//! | `Float64`      | `REAL`          |
//! | `Text`         | `TEXT`          |
//!
//! Tensor fields are not part of the registry. Their columns are declared
//! with [`TENSOR_REFERENCE_TYPE`] and resolved through the catalog instead.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TensorDbError};

/// Column type used for tensor fields. The column holds an opaque reference.
pub const TENSOR_REFERENCE_TYPE: StorageType = StorageType::Text;

/// Scalar semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point number.
    Float64,
    /// UTF-8 string.
    Text,
}

impl ScalarType {
    /// All supported scalar types.
    pub const ALL: [ScalarType; 3] = [ScalarType::Integer, ScalarType::Float64, ScalarType::Text];

    /// Returns the type name as a static string.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Integer => "integer",
            ScalarType::Float64 => "float64",
            ScalarType::Text => "text",
        }
    }

    /// Returns the storage column type for this scalar type.
    pub fn sql_type(&self) -> StorageType {
        match self {
            ScalarType::Integer => StorageType::Integer,
            ScalarType::Float64 => StorageType::Real,
            ScalarType::Text => StorageType::Text,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a caller-declared type name.
///
/// Accepts the canonical names plus the common aliases `int`, `i64`,
/// `float`, `f64`, `str` and `string`. Anything else, `bool` included,
/// fails with [`TensorDbError::UnsupportedType`].
impl FromStr for ScalarType {
    type Err = TensorDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" | "i64" => Ok(ScalarType::Integer),
            "float64" | "float" | "f64" => Ok(ScalarType::Float64),
            "text" | "str" | "string" => Ok(ScalarType::Text),
            _ => Err(TensorDbError::UnsupportedType(s.to_string())),
        }
    }
}

/// Native SQLite column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// `INTEGER`
    Integer,
    /// `REAL`
    Real,
    /// `TEXT`
    Text,
}

impl StorageType {
    /// Returns the SQL keyword used in DDL.
    pub fn as_sql(&self) -> &'static str {
        match self {
            StorageType::Integer => "INTEGER",
            StorageType::Real => "REAL",
            StorageType::Text => "TEXT",
        }
    }

    /// Parses a declared column type as reported by table introspection.
    ///
    /// Returns `None` for types outside the registry.
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared.trim().to_ascii_uppercase().as_str() {
            "INTEGER" => Some(StorageType::Integer),
            "REAL" => Some(StorageType::Real),
            "TEXT" => Some(StorageType::Text),
            _ => None,
        }
    }

    /// Returns the scalar type stored in columns of this type.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            StorageType::Integer => ScalarType::Integer,
            StorageType::Real => ScalarType::Float64,
            StorageType::Text => ScalarType::Text,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bijection() {
        for scalar in ScalarType::ALL {
            assert_eq!(scalar.sql_type().scalar_type(), scalar);
            let declared = scalar.sql_type().as_sql();
            assert_eq!(StorageType::from_declared(declared), Some(scalar.sql_type()));
        }
    }

    #[test]
    fn test_sql_keywords() {
        assert_eq!(ScalarType::Integer.sql_type().as_sql(), "INTEGER");
        assert_eq!(ScalarType::Float64.sql_type().as_sql(), "REAL");
        assert_eq!(ScalarType::Text.sql_type().as_sql(), "TEXT");
    }

    #[test]
    fn test_declared_type_is_case_insensitive() {
        assert_eq!(StorageType::from_declared("integer"), Some(StorageType::Integer));
        assert_eq!(StorageType::from_declared(" Real "), Some(StorageType::Real));
    }

    #[test]
    fn test_unknown_declared_types() {
        for declared in ["BLOB", "NUMERIC", "VARCHAR(10)", "BOOLEAN", ""] {
            assert_eq!(StorageType::from_declared(declared), None);
        }
    }

    #[test]
    fn test_parse_scalar_type() {
        assert_eq!("int".parse::<ScalarType>().unwrap(), ScalarType::Integer);
        assert_eq!("Float".parse::<ScalarType>().unwrap(), ScalarType::Float64);
        assert_eq!("str".parse::<ScalarType>().unwrap(), ScalarType::Text);
    }

    #[test]
    fn test_parse_unsupported_scalar_type() {
        for name in ["bool", "dict", "list", "bytes"] {
            assert!(matches!(
                name.parse::<ScalarType>(),
                Err(TensorDbError::UnsupportedType(_))
            ));
        }
    }
}
