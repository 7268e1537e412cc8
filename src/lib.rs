// Copyright (c) 2025 TensorDB Contributors
// Licensed under the TensorDB License. See LICENSE file for details.

//! # TensorDB
//!
//! A typed-schema collection store written in Rust, backed by SQLite.
//!
//! A collection is a table whose fields are either scalars (integer, float,
//! text) or tensors described by an element dtype and a shape. Tensor values
//! live elsewhere; the store keeps their metadata and an opaque reference per
//! row.
//!
//! ## Features
//!
//! - **Typed collections** - Declare fields once, recover them exactly with
//!   [`TensorDb::get_fields`]
//! - **Tensor metadata** - [`tensor::TensorDescriptor`] with unbound dimensions,
//!   persisted as compact MessagePack
//! - **System catalog** - [`catalog::Catalog`] records collections and tensor
//!   fields next to the data
//! - **Safe queries** - Equality filters are always bound as parameters, field
//!   names are checked against the schema before any SQL is built
//! - **Atomic schema changes** - A collection is created completely or not at all
//!
//! ## Architecture
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`TensorDb`] | Store handle owning the SQLite connection |
//! | [`sql_types`] | Scalar type to column type registry |
//! | [`tensor`] | Dtypes, shapes and the shape codec |
//! | [`catalog`] | The `collections` and `collection_fields` system tables |
//! | [`schema`] | Table synthesis and schema reconstruction |
//! | [`query`] | Filtered projections |
//! | [`config`] | Store configuration, TOML loadable |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tensordb::{FieldMap, Result, Row, ScalarType, TensorDb, Value};
//! use tensordb::tensor::{DType, TensorDescriptor};
//!
//! fn main() -> Result<()> {
//!     let db = TensorDb::open("my_store")?;
//!
//!     let mut fields = FieldMap::new();
//!     fields.insert("label".to_string(), ScalarType::Text.into());
//!     fields.insert(
//!         "image".to_string(),
//!         TensorDescriptor::from_dims(DType::UInt8, &[Some(28), Some(28)])?.into(),
//!     );
//!     db.create_collection("mnist", &fields)?;
//!
//!     let mut row = Row::new();
//!     row.insert("label".to_string(), Value::from("seven"));
//!     row.insert("image".to_string(), Value::from("blobs/0001"));
//!     db.insert("mnist", &[row])?;
//!
//!     let mut conditions = tensordb::Conditions::new();
//!     conditions.insert("label".to_string(), Value::from("seven"));
//!     for row in db.find("mnist", Some(conditions)).select(&["id", "image"])?.execute()? {
//!         println!("{:?}", row);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod naming;
pub mod query;
pub mod schema;
pub mod sql_types;
pub mod tensor;
pub mod types;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::{ReservedTableNames, StoreConfig};
pub use engine::TensorDb;
pub use error::{Result, TensorDbError};
pub use query::{BuiltQuery, Query};
pub use sql_types::{ScalarType, StorageType};
pub use types::{Conditions, FieldMap, FieldType, Row, Value, ID_FIELD};

// Re-export tensor metadata types
pub use tensor::{DType, Dim, TensorDescriptor};
