//! Filtered projections over a collection.
//!
//! [`lower`] turns an equality-condition map and an optional projection into
//! a [`BuiltQuery`]: output field order, predicate text and positional
//! parameters. Only identifiers that exist in the collection's field map are
//! ever written into the SQL text; condition values always travel as bound
//! parameters.
//!
//! [`Query`] is the fluent object returned by
//! [`TensorDb::find`](crate::TensorDb::find).
//!
//! # Examples
//!
//! ```rust
//! use indexmap::IndexMap;
//! use tensordb::{FieldMap, ScalarType, TensorDb, Value};
//!
//! let db = TensorDb::open_in_memory().unwrap();
//!
//! let mut fields = FieldMap::new();
//! fields.insert("name".to_string(), ScalarType::Text.into());
//! fields.insert("number".to_string(), ScalarType::Integer.into());
//! db.create_collection("test", &fields).unwrap();
//!
//! for (name, number) in [("Boi", 7), ("Eva", 42), ("Bob", 420)] {
//!     let mut row = IndexMap::new();
//!     row.insert("name".to_string(), Value::from(name));
//!     row.insert("number".to_string(), Value::from(number));
//!     db.insert("test", &[row]).unwrap();
//! }
//!
//! let mut conditions = IndexMap::new();
//! conditions.insert("number".to_string(), Value::Int(42));
//!
//! let rows = db.find("test", Some(conditions)).execute().unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0]["id"], Value::Int(2));
//! assert_eq!(rows[0]["name"], Value::from("Eva"));
//! ```

use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::config::StoreConfig;
use crate::engine::TensorDb;
use crate::error::{Result, TensorDbError};
use crate::naming::quote_ident;
use crate::schema::get_fields;
use crate::types::{Conditions, FieldMap, FieldType, Row, Value, ID_FIELD};

/// Predicate used when there are no conditions.
pub const ALWAYS_TRUE: &str = "1";

/// A lowered query, ready to run against a collection's storage table.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    /// Output fields, in result column order.
    pub fields: Vec<String>,
    /// `WHERE` clause body. Placeholders are `?1`, `?2`, ... in `params` order.
    pub predicate: String,
    /// Values bound to the predicate placeholders.
    pub params: Vec<Value>,
}

impl BuiltQuery {
    /// Returns the full `SELECT` statement for `collection`.
    ///
    /// Rows come back in insertion order.
    pub fn to_sql(&self, collection: &str) -> String {
        let columns = self
            .fields
            .iter()
            .map(|f| quote_ident(f))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}",
            columns,
            quote_ident(collection),
            self.predicate,
            quote_ident(ID_FIELD)
        )
    }
}

/// Lowers conditions and a projection against a resolved field map.
///
/// - Without a projection (or with an empty one) every field is returned in
///   field map order; otherwise fields come back in projection order.
/// - Without conditions the predicate is [`ALWAYS_TRUE`]; otherwise it is
///   one equality test per condition, joined by `AND`, in map order.
///
/// Fails with [`TensorDbError::UnknownField`] for any name missing from
/// `fields`, with [`TensorDbError::InvalidName`] for a name repeated in the
/// projection, and with [`TensorDbError::TensorPredicate`] for a condition on
/// a tensor field.
pub fn lower(
    collection: &str,
    fields: &FieldMap,
    conditions: Option<&Conditions>,
    projection: Option<&[String]>,
) -> Result<BuiltQuery> {
    let output = match projection {
        Some(requested) if !requested.is_empty() => {
            for (i, name) in requested.iter().enumerate() {
                if !fields.contains_key(name) {
                    return Err(TensorDbError::unknown_field(collection, name));
                }
                if requested[..i].contains(name) {
                    return Err(TensorDbError::InvalidName(name.clone()));
                }
            }
            requested.to_vec()
        }
        _ => fields.keys().cloned().collect(),
    };

    let mut clauses = Vec::new();
    let mut params = Vec::new();
    for (name, value) in conditions.into_iter().flatten() {
        match fields.get(name) {
            None => return Err(TensorDbError::unknown_field(collection, name)),
            Some(FieldType::Tensor(_)) => {
                return Err(TensorDbError::TensorPredicate {
                    collection: collection.to_string(),
                    field: name.clone(),
                })
            }
            Some(FieldType::Scalar(_)) => {}
        }
        params.push(value.clone());
        clauses.push(format!("{} = ?{}", quote_ident(name), params.len()));
    }

    let predicate = if clauses.is_empty() {
        ALWAYS_TRUE.to_string()
    } else {
        clauses.join(" AND ")
    };

    Ok(BuiltQuery {
        fields: output,
        predicate,
        params,
    })
}

/// Resolves the field map of `collection` and lowers the query against it.
pub fn build(
    conn: &Connection,
    config: &StoreConfig,
    collection: &str,
    conditions: Option<&Conditions>,
    projection: Option<&[String]>,
) -> Result<BuiltQuery> {
    let fields = get_fields(conn, config, collection)?;
    lower(collection, &fields, conditions, projection)
}

/// Runs a lowered query and collects rows keyed by output field.
pub(crate) fn run(conn: &Connection, collection: &str, query: &BuiltQuery) -> Result<Vec<Row>> {
    let sql = query.to_sql(collection);
    debug!(collection, sql = %sql, params = query.params.len(), "executing query");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut out = Row::with_capacity(query.fields.len());
        for (i, field) in query.fields.iter().enumerate() {
            out.insert(field.clone(), row.get::<_, Value>(i)?);
        }
        results.push(out);
    }
    Ok(results)
}

/// A query against one collection, built fluently and run with [`Query::execute`].
pub struct Query<'db> {
    db: &'db TensorDb,
    collection: String,
    conditions: Option<Conditions>,
    projection: Option<Vec<String>>,
}

impl<'db> Query<'db> {
    pub(crate) fn new(db: &'db TensorDb, collection: &str, conditions: Option<Conditions>) -> Self {
        Self {
            db,
            collection: collection.to_string(),
            conditions,
            projection: None,
        }
    }

    /// Restricts the output to `fields`, in the given order.
    ///
    /// Each name may appear once; a repeated name makes the query fail with
    /// [`TensorDbError::InvalidName`] when it is built. Fails with
    /// [`TensorDbError::ProjectionAlreadySet`] if called twice.
    pub fn select<S: AsRef<str>>(mut self, fields: &[S]) -> Result<Self> {
        if self.projection.is_some() {
            return Err(TensorDbError::ProjectionAlreadySet);
        }
        self.projection = Some(fields.iter().map(|f| f.as_ref().to_string()).collect());
        Ok(self)
    }

    /// Lowers the query without running it.
    pub fn build(&self) -> Result<BuiltQuery> {
        let conn = self.db.conn();
        build(
            &conn,
            self.db.config(),
            &self.collection,
            self.conditions.as_ref(),
            self.projection.as_deref(),
        )
    }

    /// Runs the query, returning matching rows in insertion order.
    pub fn execute(&self) -> Result<Vec<Row>> {
        let conn = self.db.conn();
        let built = build(
            &conn,
            self.db.config(),
            &self.collection,
            self.conditions.as_ref(),
            self.projection.as_deref(),
        )?;
        run(&conn, &self.collection, &built)
    }
}
