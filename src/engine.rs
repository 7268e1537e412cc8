//! Store handle for TensorDB.
//!
//! This module contains [`TensorDb`], the entry point that owns the SQLite
//! connection and exposes the schema and query operations:
//!
//! - [`TensorDb::create_collection`] / [`TensorDb::get_fields`]
//! - [`TensorDb::collection_exists`] / [`TensorDb::list_collection_names`]
//! - [`TensorDb::insert`] and [`TensorDb::find`] for rows
//!
//! # Usage
//!
//! ```rust,no_run
//! use tensordb::{FieldMap, ScalarType, TensorDb};
//! use tensordb::tensor::{DType, TensorDescriptor};
//!
//! let db = TensorDb::open("my_store").unwrap();
//!
//! let mut fields = FieldMap::new();
//! fields.insert("label".to_string(), ScalarType::Text.into());
//! fields.insert(
//!     "embedding".to_string(),
//!     TensorDescriptor::from_dims(DType::Float32, &[Some(768)]).unwrap().into(),
//! );
//! db.create_collection("documents", &fields).unwrap();
//! ```
//!
//! # Concurrency
//!
//! One connection per store. The connection sits behind a mutex, so a
//! `TensorDb` can be shared between threads, but every statement runs
//! sequentially. Multiple processes writing the same store are not
//! coordinated.

use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::StoreConfig;
use crate::error::{Result, TensorDbError};
use crate::naming::quote_ident;
use crate::query::{self, BuiltQuery, Query};
use crate::schema;
use crate::types::{Conditions, FieldMap, Row, ID_FIELD};

/// A typed-schema collection store backed by one SQLite connection.
///
/// # Examples
///
/// ```rust
/// use tensordb::{FieldMap, ScalarType, TensorDb};
/// use tensordb::tensor::{DType, TensorDescriptor};
///
/// let db = TensorDb::open_in_memory().unwrap();
///
/// let mut fields = FieldMap::new();
/// fields.insert("t".to_string(), TensorDescriptor::from_dims(DType::Int32, &[None, Some(2)]).unwrap().into());
/// db.create_collection("test", &fields).unwrap();
///
/// let recovered = db.get_fields("test").unwrap();
/// assert_eq!(recovered["t"], fields["t"]);
/// assert_eq!(recovered["id"], ScalarType::Integer.into());
/// ```
pub struct TensorDb {
    /// Directory holding the database file, `None` for in-memory stores.
    dir: Option<PathBuf>,
    /// Configuration the store was opened with.
    config: StoreConfig,
    /// The single engine connection.
    conn: Mutex<Connection>,
}

impl TensorDb {
    /// Opens the store in `dir` with the default configuration, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(dir, StoreConfig::default())
    }

    /// Opens the store in `dir`, creating the directory and catalog tables if needed.
    pub fn open_with_config(dir: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let dir = dir.as_ref().to_path_buf();

        if dir.exists() {
            info!(path = %dir.display(), "loading existing store");
        } else {
            std::fs::create_dir_all(&dir)?;
            info!(path = %dir.display(), "creating new store");
        }

        let conn = Connection::open(dir.join(&config.db_file_name))?;
        Self::bootstrap(Some(dir), config, conn)
    }

    /// Opens a store that lives only in memory.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_config(StoreConfig::default())
    }

    /// Opens an in-memory store with the given configuration.
    pub fn open_in_memory_with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(None, config, conn)
    }

    fn bootstrap(dir: Option<PathBuf>, config: StoreConfig, mut conn: Connection) -> Result<Self> {
        let tx = conn.transaction()?;
        Catalog::new(&tx, &config.reserved_table_names).create_tables()?;
        tx.commit()?;

        Ok(Self {
            dir,
            config,
            conn: Mutex::new(conn),
        })
    }

    /// Directory the store lives in, `None` for in-memory stores.
    pub fn location(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Creates a collection with the given fields and returns its catalog id.
    ///
    /// See [`schema::create_collection`] for the validation rules. On any
    /// failure the store is left exactly as it was.
    pub fn create_collection(&self, name: &str, fields: &FieldMap) -> Result<i64> {
        let mut conn = self.conn();
        schema::create_collection(&mut conn, &self.config, name, fields)
    }

    /// Returns `true` if a collection with this name exists.
    pub fn collection_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn();
        Catalog::new(&conn, &self.config.reserved_table_names).collection_exists(name)
    }

    /// Returns the field map of a collection, `id` included.
    pub fn get_fields(&self, name: &str) -> Result<FieldMap> {
        let conn = self.conn();
        schema::get_fields(&conn, &self.config, name)
    }

    /// Returns every collection name, in creation order.
    pub fn list_collection_names(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        Catalog::new(&conn, &self.config.reserved_table_names).list_collection_names()
    }

    /// Lowers a filtered projection against the current schema of `collection`.
    pub fn build_query(
        &self,
        collection: &str,
        conditions: Option<&Conditions>,
        projection: Option<&[String]>,
    ) -> Result<BuiltQuery> {
        let conn = self.conn();
        query::build(&conn, &self.config, collection, conditions, projection)
    }

    /// Starts a query on `collection`, filtered by equality `conditions`.
    pub fn find(&self, collection: &str, conditions: Option<Conditions>) -> Query<'_> {
        Query::new(self, collection, conditions)
    }

    /// Inserts rows in one transaction and returns their assigned ids.
    ///
    /// Each row must hold exactly the collection's fields other than `id`,
    /// with values that fit the field types (see [`Value::fits`](crate::Value::fits)).
    /// Nothing is written if any row is rejected.
    pub fn insert(&self, collection: &str, rows: &[Row]) -> Result<Vec<i64>> {
        let mut conn = self.conn();

        let mut fields = schema::get_fields(&conn, &self.config, collection)?;
        fields.shift_remove(ID_FIELD);

        for row in rows {
            if let Some(extra) = row.keys().find(|k| !fields.contains_key(*k)) {
                return Err(TensorDbError::invalid_row(
                    collection,
                    format!("unexpected field {:?}", extra),
                ));
            }
            for (name, field_type) in &fields {
                let value = row.get(name).ok_or_else(|| {
                    TensorDbError::invalid_row(collection, format!("missing field {:?}", name))
                })?;
                if !value.fits(field_type) {
                    return Err(TensorDbError::invalid_row(
                        collection,
                        format!(
                            "{} value does not fit field {:?} of type {}",
                            value.type_name(),
                            name,
                            field_type
                        ),
                    ));
                }
            }
        }

        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(collection))
        } else {
            let columns = fields.keys().map(|f| quote_ident(f)).collect::<Vec<_>>();
            let placeholders = (1..=fields.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(collection),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(fields.keys().map(|name| &row[name])))?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        debug!(collection, rows = ids.len(), "inserted rows");
        Ok(ids)
    }
}
