//! System catalog.
//!
//! Two tables hold schema metadata independently of the per-collection
//! storage tables:
//!
//! ```text
//! collections(id INTEGER PRIMARY KEY, name TEXT UNIQUE)
//! collection_fields(id INTEGER PRIMARY KEY, collection_id INTEGER, field_name TEXT,
//!                   dtype TEXT, shape BLOB, UNIQUE(collection_id, field_name))
//! ```
//!
//! Only tensor fields get a `collection_fields` row. Scalar field types are
//! recovered from storage-table introspection, see [`crate::schema`].
//!
//! A [`Catalog`] borrows a connection, so it works the same over a plain
//! [`Connection`] and over a [`rusqlite::Transaction`] (which derefs to one).

use indexmap::IndexMap;
use rusqlite::{ffi, params, Connection, OptionalExtension};

use crate::config::ReservedTableNames;
use crate::error::{Result, TensorDbError};
use crate::naming::quote_ident;
use crate::tensor::TensorDescriptor;

/// Catalog operations over a borrowed connection.
pub struct Catalog<'a> {
    conn: &'a Connection,
    tables: &'a ReservedTableNames,
}

impl<'a> Catalog<'a> {
    /// Wraps a connection using the given catalog table names.
    pub fn new(conn: &'a Connection, tables: &'a ReservedTableNames) -> Self {
        Self { conn, tables }
    }

    fn collections_table(&self) -> String {
        quote_ident(&self.tables.collections)
    }

    fn fields_table(&self) -> String {
        quote_ident(&self.tables.collection_fields)
    }

    /// Creates both catalog tables if they do not exist yet.
    pub fn create_tables(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collections} (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE
            );
            CREATE TABLE IF NOT EXISTS {fields} (
                id INTEGER PRIMARY KEY,
                collection_id INTEGER,
                field_name TEXT,
                dtype TEXT,
                shape BLOB,
                UNIQUE(collection_id, field_name)
            );",
            collections = self.collections_table(),
            fields = self.fields_table(),
        ))?;
        Ok(())
    }

    /// Returns `true` iff a collection with this name is registered.
    pub fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collection_id(name)?.is_some())
    }

    /// Returns the catalog id of a collection, if registered.
    pub fn collection_id(&self, name: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE name = ?1",
            self.collections_table()
        );
        let id = self
            .conn
            .query_row(&sql, params![name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    /// Registers a collection and returns its assigned id.
    ///
    /// Not idempotent: a second call with the same name fails with
    /// [`TensorDbError::DuplicateCollection`].
    pub fn insert_collection(&self, name: &str) -> Result<i64> {
        let sql = format!("INSERT INTO {} (name) VALUES (?1)", self.collections_table());
        match self.conn.execute(&sql, params![name]) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(TensorDbError::DuplicateCollection(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        self.collection_id(name)?
            .ok_or_else(|| TensorDbError::CollectionNotFound(name.to_string()))
    }

    /// Records the metadata of one tensor field.
    pub fn insert_field_metadata(
        &self,
        collection_id: i64,
        field_name: &str,
        descriptor: &TensorDescriptor,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (collection_id, field_name, dtype, shape) VALUES (?1, ?2, ?3, ?4)",
            self.fields_table()
        );
        let shape = descriptor.encode_shape()?;
        self.conn.execute(
            &sql,
            params![collection_id, field_name, descriptor.dtype().name(), shape],
        )?;
        Ok(())
    }

    /// Returns the tensor fields of a collection, in registration order.
    ///
    /// An unknown collection yields an empty map.
    pub fn get_tensor_fields(&self, collection_name: &str) -> Result<IndexMap<String, TensorDescriptor>> {
        let sql = format!(
            "SELECT f.field_name, f.dtype, f.shape
             FROM {fields} AS f
             JOIN {collections} AS c ON c.id = f.collection_id
             WHERE c.name = ?1
             ORDER BY f.id",
            fields = self.fields_table(),
            collections = self.collections_table(),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![collection_name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut tensor_fields = IndexMap::new();
        for row in rows {
            let (field_name, dtype, shape) = row?;
            let descriptor = TensorDescriptor::decode(&dtype, &shape)?;
            tensor_fields.insert(field_name, descriptor);
        }
        Ok(tensor_fields)
    }

    /// Returns every collection name, in creation order.
    pub fn list_collection_names(&self) -> Result<Vec<String>> {
        let sql = format!("SELECT name FROM {} ORDER BY id", self.collections_table());
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}
