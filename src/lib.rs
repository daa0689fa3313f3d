//! sheets-orm
//!
//! A small object-record mapper over spreadsheet-style grid stores.
//!
//! # Features
//!
//! - Tables declared in code or in a YAML schema file
//! - Row tables (header row, one record per row) and column tables (one
//!   field per row, one record per column, nested composite fields)
//! - Additive schema sync: missing headers are appended, nothing is removed
//! - Primary-key lookup, insert with prepend or append placement, upsert
//! - Pluggable backend through the [`GridStore`] trait, with an in-memory
//!   store for tests
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use sheets_orm::{Field, MemoryGridStore, Orm, ScalarType, TableOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> sheets_orm::Result<()> {
//! let orm = Orm::new(Arc::new(MemoryGridStore::new()));
//! let users = orm.database("crm").table(
//!     "Users",
//!     vec![
//!         Field::new("id").primary_key(),
//!         Field::new("age").scalar(ScalarType::Integer),
//!     ],
//!     TableOptions::default(),
//! )?;
//!
//! users.insert(json!({"id": "u1", "age": "41"})).await?;
//! let found = users.find_by_pk("u1").await?.expect("inserted above");
//! assert_eq!(found.get("age"), Some(&json!(41)));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod field;
pub mod record;
pub mod sheet;
pub mod sync_state;
pub mod table;

pub use config::{
    FieldSchema, FieldTypeName, InsertOrder, SchemaFile, TableMode, TableOptions, TableSchema,
};
pub use database::{Database, Orm};
pub use error::{ConfigError, OrmError, Result, ValidationError, ValueSetExistsError};
pub use field::{Coercer, DefaultValue, Field, FieldType, Producer};
pub use record::{Position, Record};
pub use sheet::Sheet;
pub use sync_state::SyncStatus;
pub use table::{ColumnLayout, Layout, ResolvedColumn, ResolvedRow, RowLayout, Table};

pub use grid_store::{
    Dimension, DocumentInfo, DocumentLookup, DocumentSummary, GridStore, GridStoreError,
    MemoryGridStore, StoreStats, StructuralReply, StructuralRequest, SubGridInfo,
};
pub use sheet_types::{column_index, column_letter, CellValue, ScalarType};
