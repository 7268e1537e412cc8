//! Schema synthesis and reconstruction.
//!
//! The write side, [`create_collection`], turns a [`FieldMap`] into a storage
//! table plus catalog rows. The read side, [`get_fields`], rebuilds the
//! field map by merging two sources:
//!
//! 1. Storage-table introspection, resolved through the type registry.
//! 2. Tensor metadata from the catalog, which always overrides (1).
//!
//! # Storage Table Layout
//!
//! ```text
//! CREATE TABLE "<collection>" (
//!     "id" INTEGER PRIMARY KEY,      -- implicit, assigned by the engine
//!     "<scalar field>" INTEGER | REAL | TEXT,
//!     "<tensor field>" TEXT,         -- opaque reference
//!     ...                            -- in field map order
//! )
//! ```

use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::StoreConfig;
use crate::error::{Result, TensorDbError};
use crate::naming::{is_valid_name, quote_ident};
use crate::sql_types::{ScalarType, StorageType, TENSOR_REFERENCE_TYPE};
use crate::types::{FieldMap, FieldType, ID_FIELD};

/// Checks a collection name and its field map before anything is written.
///
/// Fails with [`TensorDbError::InvalidName`] for names outside the naming
/// rule, reserved table names, and field names equal up to ASCII case
/// (SQLite column names are case-insensitive). Fails with
/// [`TensorDbError::ReservedFieldName`] if `id` is declared.
pub fn validate_collection(config: &StoreConfig, name: &str, fields: &FieldMap) -> Result<()> {
    if !is_valid_name(name) || config.is_reserved_table_name(name) {
        return Err(TensorDbError::InvalidName(name.to_string()));
    }

    for field_name in fields.keys() {
        if !is_valid_name(field_name) {
            return Err(TensorDbError::InvalidName(field_name.to_string()));
        }
    }

    if let Some(id) = fields.keys().find(|k| k.eq_ignore_ascii_case(ID_FIELD)) {
        return Err(TensorDbError::ReservedFieldName(id.to_string()));
    }

    for (i, field_name) in fields.keys().enumerate() {
        if fields
            .keys()
            .skip(i + 1)
            .any(|other| other.eq_ignore_ascii_case(field_name))
        {
            return Err(TensorDbError::InvalidName(field_name.to_string()));
        }
    }

    Ok(())
}

/// Returns the storage column type for a field.
pub fn column_type(field_type: &FieldType) -> StorageType {
    match field_type {
        FieldType::Scalar(scalar) => scalar.sql_type(),
        FieldType::Tensor(_) => TENSOR_REFERENCE_TYPE,
    }
}

/// Builds the `CREATE TABLE` statement for a collection.
///
/// Output is deterministic: `id` first, then one column per field in map order.
pub fn table_definition(name: &str, fields: &FieldMap) -> String {
    let mut columns = Vec::with_capacity(fields.len() + 1);
    columns.push(format!(
        "{} {} PRIMARY KEY",
        quote_ident(ID_FIELD),
        StorageType::Integer
    ));
    for (field_name, field_type) in fields {
        columns.push(format!("{} {}", quote_ident(field_name), column_type(field_type)));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_ident(name),
        columns.join(",\n    ")
    )
}

/// Returns `true` if a table with this name exists in the database.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Introspects a table, returning `(column name, declared type)` pairs in column order.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map(params![table], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
    Ok(columns)
}

/// Creates a collection: storage table, catalog row and tensor field rows.
///
/// All validation runs before the transaction opens. The three writes then
/// commit together or not at all.
///
/// Returns the catalog id of the new collection.
pub fn create_collection(
    conn: &mut Connection,
    config: &StoreConfig,
    name: &str,
    fields: &FieldMap,
) -> Result<i64> {
    validate_collection(config, name, fields)?;

    let tables = &config.reserved_table_names;
    if Catalog::new(conn, tables).collection_exists(name)? {
        return Err(TensorDbError::CollectionAlreadyExists(name.to_string()));
    }
    if table_exists(conn, name)? {
        // Table names are case-insensitive, catalog names are not.
        let registered = Catalog::new(conn, tables).list_collection_names()?;
        if registered.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return Err(TensorDbError::CollectionAlreadyExists(name.to_string()));
        }
        return Err(TensorDbError::SchemaConsistencyViolation {
            collection: name.to_string(),
            reason: "storage table exists without a catalog row".to_string(),
        });
    }

    let ddl = table_definition(name, fields);
    debug!(collection = name, sql = %ddl, "creating storage table");

    let tx = conn.transaction()?;
    let written = (|| {
        tx.execute_batch(&ddl)?;
        let catalog = Catalog::new(&tx, tables);
        let id = catalog.insert_collection(name)?;
        for (field_name, field_type) in fields {
            if let FieldType::Tensor(descriptor) = field_type {
                catalog.insert_field_metadata(id, field_name, descriptor)?;
            }
        }
        Ok::<_, TensorDbError>(id)
    })();

    match written {
        Ok(id) => {
            tx.commit()?;
            info!(
                collection = name,
                id,
                fields = fields.len(),
                tensor_fields = fields.values().filter(|f| !f.is_scalar()).count(),
                "created collection"
            );
            Ok(id)
        }
        Err(e) => {
            warn!(collection = name, error = %e, "rolling back collection creation");
            if let Err(rollback_err) = tx.rollback() {
                warn!(collection = name, error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Reconstructs the field map of a collection, `id` included.
///
/// Columns come back in storage order. Fails with
/// [`TensorDbError::UnknownColumnType`] for a column type outside the
/// registry and with [`TensorDbError::SchemaConsistencyViolation`] when the
/// catalog and the storage table disagree.
pub fn get_fields(conn: &Connection, config: &StoreConfig, name: &str) -> Result<FieldMap> {
    let catalog = Catalog::new(conn, &config.reserved_table_names);
    if !catalog.collection_exists(name)? {
        return Err(TensorDbError::CollectionNotFound(name.to_string()));
    }

    let mut tensor_fields = catalog.get_tensor_fields(name)?;
    let columns = table_columns(conn, name)?;
    if columns.is_empty() {
        return Err(TensorDbError::SchemaConsistencyViolation {
            collection: name.to_string(),
            reason: "catalog row exists without a storage table".to_string(),
        });
    }

    let mut fields = FieldMap::with_capacity(columns.len());
    for (column, declared) in columns {
        let scalar = StorageType::from_declared(&declared)
            .map(|storage| storage.scalar_type())
            .ok_or_else(|| TensorDbError::UnknownColumnType {
                collection: name.to_string(),
                column: column.clone(),
                column_type: declared.clone(),
            })?;

        let field_type = match tensor_fields.shift_remove(&column) {
            Some(descriptor) => FieldType::Tensor(descriptor),
            None => FieldType::Scalar(scalar),
        };
        fields.insert(column, field_type);
    }

    if let Some(orphan) = tensor_fields.keys().next() {
        return Err(TensorDbError::SchemaConsistencyViolation {
            collection: name.to_string(),
            reason: format!("tensor field {:?} has no storage column", orphan),
        });
    }

    match fields.get(ID_FIELD) {
        Some(FieldType::Scalar(ScalarType::Integer)) => Ok(fields),
        _ => Err(TensorDbError::SchemaConsistencyViolation {
            collection: name.to_string(),
            reason: format!("missing integer {:?} column", ID_FIELD),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{DType, TensorDescriptor};

    fn setup() -> (Connection, StoreConfig) {
        let conn = Connection::open_in_memory().unwrap();
        let config = StoreConfig::default();
        Catalog::new(&conn, &config.reserved_table_names)
            .create_tables()
            .unwrap();
        (conn, config)
    }

    fn mixed_fields() -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("field1".to_string(), ScalarType::Integer.into());
        fields.insert("field2".to_string(), ScalarType::Float64.into());
        fields.insert("field3".to_string(), ScalarType::Text.into());
        fields.insert(
            "tensorfield".to_string(),
            TensorDescriptor::from_dims(DType::Int64, &[None, Some(2)])
                .unwrap()
                .into(),
        );
        fields
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_table_definition_order() {
        let ddl = table_definition("test_collection", &mixed_fields());
        assert_eq!(
            ddl,
            "CREATE TABLE \"test_collection\" (\n    \
             \"id\" INTEGER PRIMARY KEY,\n    \
             \"field1\" INTEGER,\n    \
             \"field2\" REAL,\n    \
             \"field3\" TEXT,\n    \
             \"tensorfield\" TEXT\n)"
        );
    }

    #[test]
    fn test_create_then_get_fields() {
        let (mut conn, config) = setup();
        let fields = mixed_fields();
        create_collection(&mut conn, &config, "test_collection", &fields).unwrap();

        let mut recovered = get_fields(&conn, &config, "test_collection").unwrap();
        assert_eq!(
            recovered.shift_remove(ID_FIELD),
            Some(FieldType::Scalar(ScalarType::Integer))
        );
        assert_eq!(recovered, fields);

        let order: Vec<&str> = recovered.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["field1", "field2", "field3", "tensorfield"]);
    }

    #[test]
    fn test_only_tensor_fields_hit_the_catalog() {
        let (mut conn, config) = setup();
        create_collection(&mut conn, &config, "c", &mixed_fields()).unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM collection_fields"), 1);
    }

    #[test]
    fn test_validation_errors() {
        let config = StoreConfig::default();
        let fields = mixed_fields();

        assert!(matches!(
            validate_collection(&config, "bad name", &fields),
            Err(TensorDbError::InvalidName(_))
        ));
        assert!(matches!(
            validate_collection(&config, "collections", &fields),
            Err(TensorDbError::InvalidName(_))
        ));

        let mut bad_field = fields.clone();
        bad_field.insert("x-y".to_string(), ScalarType::Text.into());
        assert!(matches!(
            validate_collection(&config, "ok", &bad_field),
            Err(TensorDbError::InvalidName(name)) if name == "x-y"
        ));

        let mut with_id = fields.clone();
        with_id.insert("ID".to_string(), ScalarType::Integer.into());
        assert!(matches!(
            validate_collection(&config, "ok", &with_id),
            Err(TensorDbError::ReservedFieldName(_))
        ));

        let mut case_dup = fields;
        case_dup.insert("FIELD1".to_string(), ScalarType::Text.into());
        assert!(matches!(
            validate_collection(&config, "ok", &case_dup),
            Err(TensorDbError::InvalidName(_))
        ));
    }

    #[test]
    fn test_failed_creation_leaves_no_state() {
        let (mut conn, config) = setup();

        let mut with_id = mixed_fields();
        with_id.insert("id".to_string(), ScalarType::Integer.into());
        assert!(create_collection(&mut conn, &config, "broken", &with_id).is_err());

        assert!(!table_exists(&conn, "broken").unwrap());
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM collections"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM collection_fields"), 0);
    }

    #[test]
    fn test_catalog_failure_rolls_back_table() {
        let (mut conn, config) = setup();

        // Make the catalog insert fail after the storage table was created.
        conn.execute_batch(
            "CREATE TRIGGER reject_insert BEFORE INSERT ON collections
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        let result = create_collection(&mut conn, &config, "victim", &mixed_fields());
        assert!(matches!(result, Err(TensorDbError::Sqlite(_))));
        assert!(!table_exists(&conn, "victim").unwrap());
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM collection_fields"), 0);
    }

    #[test]
    fn test_field_metadata_failure_rolls_back_everything() {
        let (mut conn, config) = setup();

        conn.execute_batch(
            "CREATE TRIGGER reject_field BEFORE INSERT ON collection_fields
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

        let result = create_collection(&mut conn, &config, "victim", &mixed_fields());
        assert!(matches!(result, Err(TensorDbError::Sqlite(_))));
        assert!(!table_exists(&conn, "victim").unwrap());
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM collections"), 0);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM collection_fields"), 0);
    }

    #[test]
    fn test_extended_precision_dtype_in_catalog() {
        let (mut conn, config) = setup();
        let mut fields = FieldMap::new();
        fields.insert("t".to_string(), ScalarType::Text.into());
        let id = create_collection(&mut conn, &config, "test", &fields).unwrap();

        // (None, 2) as written by another process sharing the store
        conn.execute(
            "INSERT INTO collection_fields (collection_id, field_name, dtype, shape)
             VALUES (?1, 't', 'float128', X'92C002')",
            params![id],
        )
        .unwrap();

        let recovered = get_fields(&conn, &config, "test").unwrap();
        assert_eq!(
            recovered["t"],
            FieldType::Tensor(
                TensorDescriptor::from_dims(DType::Float128, &[None, Some(2)]).unwrap()
            )
        );
    }

    #[test]
    fn test_unregistered_table_is_inconsistent() {
        let (mut conn, config) = setup();
        conn.execute_batch("CREATE TABLE stray (id INTEGER PRIMARY KEY)")
            .unwrap();

        let result = create_collection(&mut conn, &config, "stray", &FieldMap::new());
        assert!(matches!(
            result,
            Err(TensorDbError::SchemaConsistencyViolation { .. })
        ));
    }

    #[test]
    fn test_name_differing_only_in_case_already_exists() {
        let (mut conn, config) = setup();
        create_collection(&mut conn, &config, "Readings", &FieldMap::new()).unwrap();

        let result = create_collection(&mut conn, &config, "readings", &FieldMap::new());
        assert!(matches!(result, Err(TensorDbError::CollectionAlreadyExists(_))));
    }

    #[test]
    fn test_get_fields_not_found() {
        let (conn, config) = setup();
        assert!(matches!(
            get_fields(&conn, &config, "nope"),
            Err(TensorDbError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_column_type() {
        let (mut conn, config) = setup();
        create_collection(&mut conn, &config, "c", &FieldMap::new()).unwrap();
        conn.execute_batch("ALTER TABLE c ADD COLUMN payload BLOB")
            .unwrap();

        assert!(matches!(
            get_fields(&conn, &config, "c"),
            Err(TensorDbError::UnknownColumnType { column, .. }) if column == "payload"
        ));
    }

    #[test]
    fn test_orphan_tensor_metadata() {
        let (mut conn, config) = setup();
        create_collection(&mut conn, &config, "c", &FieldMap::new()).unwrap();

        let catalog = Catalog::new(&conn, &config.reserved_table_names);
        let id = catalog.collection_id("c").unwrap().unwrap();
        let desc = TensorDescriptor::from_dims(DType::Float32, &[Some(3)]).unwrap();
        catalog.insert_field_metadata(id, "ghost", &desc).unwrap();

        assert!(matches!(
            get_fields(&conn, &config, "c"),
            Err(TensorDbError::SchemaConsistencyViolation { .. })
        ));
    }

    #[test]
    fn test_missing_storage_table() {
        let (conn, config) = setup();
        Catalog::new(&conn, &config.reserved_table_names)
            .insert_collection("phantom")
            .unwrap();

        assert!(matches!(
            get_fields(&conn, &config, "phantom"),
            Err(TensorDbError::SchemaConsistencyViolation { .. })
        ));
    }

    #[test]
    fn test_table_columns() {
        let (mut conn, config) = setup();
        create_collection(&mut conn, &config, "c", &mixed_fields()).unwrap();

        let columns = table_columns(&conn, "c").unwrap();
        assert_eq!(columns[0], ("id".to_string(), "INTEGER".to_string()));
        assert_eq!(columns[4], ("tensorfield".to_string(), "TEXT".to_string()));
        assert!(table_columns(&conn, "missing").unwrap().is_empty());
    }
}
