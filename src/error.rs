//! Error types for sheets-orm.

use std::fmt;
use std::sync::Arc;

use sheet_types::RangeParseError;

use crate::config::{InsertOrder, TableMode};

/// Result alias used throughout the crate.
pub type Result<T, E = OrmError> = std::result::Result<T, E>;

/// Top-level error for every record and schema operation.
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// Table or schema definition is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Record values do not satisfy the schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Primary key already present on insert
    #[error(transparent)]
    ValueSetExists(#[from] ValueSetExistsError),

    /// Record was never written, so it has no grid position to update
    #[error("{mode} in table '{table}' has no grid position; insert it first")]
    NotPersisted { table: String, mode: TableMode },

    /// Grid store reported a written range we could not interpret
    #[error("unexpected written range from grid store: {0}")]
    RangeParse(#[from] RangeParseError),

    /// Grid store failure, passed through as-is
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    /// A memoized synchronization failed earlier
    #[error("synchronization failed: {0}")]
    SyncFailed(#[source] Arc<OrmError>),
}

impl OrmError {
    /// The error behind any number of [`OrmError::SyncFailed`] wrappers.
    pub fn root(&self) -> &OrmError {
        match self {
            Self::SyncFailed(inner) => inner.root(),
            other => other,
        }
    }

    pub fn is_row_exists(&self) -> bool {
        matches!(self, Self::ValueSetExists(e) if e.mode == TableMode::Row)
    }

    pub fn is_column_exists(&self) -> bool {
        matches!(self, Self::ValueSetExists(e) if e.mode == TableMode::Column)
    }
}

/// Invalid table or schema definition. Raised at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required to define a table")]
    MissingArgument(&'static str),

    #[error("table '{0}' must have a primary key field")]
    MissingPrimaryKey(String),

    #[error("table '{table}' has more than one primary key: {fields:?}")]
    DuplicatePrimaryKey { table: String, fields: Vec<String> },

    #[error("table '{table}' declares field '{field}' more than once")]
    DuplicateField { table: String, field: String },

    #[error("insert order {order} is not supported for mode {mode}")]
    UnsupportedInsertOrder { mode: TableMode, order: InsertOrder },

    #[error("table mode must be one of [ROW, COLUMN], got '{0}'")]
    InvalidMode(String),

    #[error("table insert order must be one of [PREPEND, APPEND], got '{0}'")]
    InvalidInsertOrder(String),

    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("table not found in schema: {0}")]
    TableNotFound(String),
}

/// Record values rejected before touching the grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("field {0} is required")]
    RequiredField(String),

    #[error("record values must be an object, got {0}")]
    NotAnObject(String),

    #[error("primary key field '{0}' must be present in values")]
    MissingPrimaryKey(String),
}

/// A record with the same primary key already exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSetExistsError {
    pub mode: TableMode,
    pub table: String,
    pub key: serde_json::Value,
}

impl fmt::Display for ValueSetExistsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} with primary key {} already exists in table '{}'",
            self.mode,
            sheet_types::cell_text(&self.key),
            self.table
        )
    }
}

impl std::error::Error for ValueSetExistsError {}
