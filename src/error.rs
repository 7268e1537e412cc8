//! Error types for TensorDB operations.
//!
//! This module provides:
//! - [`TensorDbError`] - The error enum surfaced by every store operation
//! - [`Result<T>`] - A type alias for `std::result::Result<T, TensorDbError>`
//!
//! Validation failures are reported synchronously and never retried. Failures
//! of the underlying SQLite engine are wrapped in [`TensorDbError::Sqlite`].

/// Result type alias for TensorDB operations.
///
/// This is equivalent to `std::result::Result<T, TensorDbError>`.
pub type Result<T> = std::result::Result<T, TensorDbError>;

/// Error types for TensorDB operations.
///
/// # Examples
///
/// ```rust
/// use indexmap::IndexMap;
/// use tensordb::{FieldType, ScalarType, TensorDb, TensorDbError};
///
/// fn example() -> tensordb::Result<()> {
///     let db = TensorDb::open_in_memory()?;
///
///     let mut fields = IndexMap::new();
///     fields.insert("id".to_string(), FieldType::Scalar(ScalarType::Integer));
///
///     // `id` is the implicit primary key and may not be declared
///     match db.create_collection("things", &fields) {
///         Err(TensorDbError::ReservedFieldName(name)) => assert_eq!(name, "id"),
///         other => panic!("unexpected result: {:?}", other),
///     }
///
///     Ok(())
/// }
/// # example().unwrap();
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TensorDbError {
    /// A collection or field name does not match `[A-Za-z0-9_]+`, collides
    /// with a reserved table name, or is repeated in a projection.
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// The implicit primary key was declared as a field.
    #[error("Reserved field name: {0:?} is assigned by the store")]
    ReservedFieldName(String),

    /// A declared scalar type has no storage column type.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// `create_collection` was called with a name that already exists.
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),

    /// A catalog row with this name is already present.
    #[error("Duplicate collection in catalog: {0}")]
    DuplicateCollection(String),

    /// No catalog row exists for the collection.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// A projection or condition references a field the collection does not have.
    #[error("Unknown field {field:?} in collection {collection}")]
    UnknownField {
        /// Collection that was queried
        collection: String,
        /// Field name that could not be resolved
        field: String,
    },

    /// A condition targets a tensor field; only scalar fields can be filtered on.
    #[error("Tensor field {field:?} in collection {collection} cannot be used in a condition")]
    TensorPredicate {
        /// Collection that was queried
        collection: String,
        /// Tensor field named in the condition
        field: String,
    },

    /// Table introspection returned a declared type the type registry cannot map.
    #[error("Unknown column type {column_type:?} for column {column} of {collection}")]
    UnknownColumnType {
        /// Collection whose storage table was introspected
        collection: String,
        /// Column carrying the type
        column: String,
        /// Declared SQL type as reported by the engine
        column_type: String,
    },

    /// Catalog metadata and the storage table disagree.
    #[error("Schema consistency violation in {collection}: {reason}")]
    SchemaConsistencyViolation {
        /// Collection whose schema is inconsistent
        collection: String,
        /// What disagrees
        reason: String,
    },

    /// A dtype name is not one of the supported numeric dtypes.
    #[error("Unknown dtype: {0:?}")]
    UnknownDtype(String),

    /// A tensor shape is malformed or cannot be decoded.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// A row handed to `insert` does not fit the collection schema.
    #[error("Invalid row for {collection}: {reason}")]
    InvalidRow {
        /// Target collection
        collection: String,
        /// Why the row was rejected
        reason: String,
    },

    /// `Query::select` was called more than once.
    #[error("Projection has already been selected for this query")]
    ProjectionAlreadySet,

    /// The store configuration is unusable.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Error reported by the SQLite engine.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error while preparing the store directory or reading config.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl TensorDbError {
    pub(crate) fn unknown_field(collection: &str, field: &str) -> Self {
        TensorDbError::UnknownField {
            collection: collection.to_string(),
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_row(collection: &str, reason: impl Into<String>) -> Self {
        TensorDbError::InvalidRow {
            collection: collection.to_string(),
            reason: reason.into(),
        }
    }
}
