//! Store configuration.
//!
//! Configuration is an explicit value handed to [`TensorDb`](crate::TensorDb)
//! at construction time. It can be built in code, taken from
//! [`StoreConfig::default`], or parsed from TOML:
//!
//! ```toml
//! db_file_name = "db.db"
//!
//! [reserved_table_names]
//! collections = "collections"
//! collection_fields = "collection_fields"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorDbError};
use crate::naming::is_valid_name;

/// Prefix of tables owned by SQLite itself.
const SQLITE_INTERNAL_PREFIX: &str = "sqlite_";

/// Names of the two catalog tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedTableNames {
    /// Table holding one row per collection.
    #[serde(default = "default_collections_table")]
    pub collections: String,

    /// Table holding one row per tensor field.
    #[serde(default = "default_collection_fields_table")]
    pub collection_fields: String,
}

impl Default for ReservedTableNames {
    fn default() -> Self {
        Self {
            collections: default_collections_table(),
            collection_fields: default_collection_fields_table(),
        }
    }
}

fn default_collections_table() -> String {
    "collections".to_string()
}

fn default_collection_fields_table() -> String {
    "collection_fields".to_string()
}

fn default_db_file_name() -> String {
    "db.db".to_string()
}

/// Configuration for a store instance.
///
/// # Examples
///
/// ```rust
/// use tensordb::StoreConfig;
///
/// let config = StoreConfig::from_toml_str(r#"
///     db_file_name = "tensors.sqlite"
/// "#).unwrap();
///
/// assert_eq!(config.db_file_name, "tensors.sqlite");
/// assert_eq!(config.reserved_table_names.collections, "collections");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Catalog table names.
    #[serde(default)]
    pub reserved_table_names: ReservedTableNames,

    /// File name of the SQLite database inside the store directory.
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reserved_table_names: ReservedTableNames::default(),
            db_file_name: default_db_file_name(),
        }
    }
}

impl StoreConfig {
    /// Parses a configuration from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Checks that the catalog table names are usable identifiers.
    pub fn validate(&self) -> Result<()> {
        let names = &self.reserved_table_names;
        for name in [&names.collections, &names.collection_fields] {
            if !is_valid_name(name) {
                return Err(TensorDbError::InvalidConfig(format!(
                    "reserved table name {:?} is not a valid name",
                    name
                )));
            }
        }
        if names.collections.eq_ignore_ascii_case(&names.collection_fields) {
            return Err(TensorDbError::InvalidConfig(format!(
                "reserved table names must differ, both are {:?}",
                names.collections
            )));
        }
        if self.db_file_name.is_empty() {
            return Err(TensorDbError::InvalidConfig(
                "db_file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns `true` if `name` may not be used as a collection name.
    ///
    /// SQLite table names are case-insensitive, so the comparison is too.
    pub fn is_reserved_table_name(&self, name: &str) -> bool {
        let names = &self.reserved_table_names;
        name.eq_ignore_ascii_case(&names.collections)
            || name.eq_ignore_ascii_case(&names.collection_fields)
            || name
                .get(..SQLITE_INTERNAL_PREFIX.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SQLITE_INTERNAL_PREFIX))
    }
}
