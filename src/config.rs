//! Table options and YAML schema files.
//!
//! Tables can be declared in code (see [`Field`]) or loaded from a schema
//! file:
//!
//! ```yaml
//! tables:
//!   - name: users
//!     options:
//!       mode: ROW
//!       insert_order: PREPEND
//!       skip_rows: 1
//!     fields:
//!       - name: id
//!         primary_key: true
//!       - name: age
//!         type: integer
//!       - name: tags
//!         type: array
//!         items: text
//!       - name: status
//!         default: active
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheet_types::ScalarType;

use crate::error::ConfigError;
use crate::field::{Field, FieldType};

/// Orientation of records in the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableMode {
    /// One record per row, fields addressed by header columns
    #[default]
    Row,
    /// One record per column, fields addressed by row index
    Column,
}

impl TableMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Row => "ROW",
            Self::Column => "COLUMN",
        }
    }
}

impl fmt::Display for TableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ROW" => Ok(Self::Row),
            "COLUMN" => Ok(Self::Column),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Where new records go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsertOrder {
    /// Immediately after the skip offset, shifting existing records
    Prepend,
    /// After the last existing record
    #[default]
    Append,
}

impl InsertOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepend => "PREPEND",
            Self::Append => "APPEND",
        }
    }
}

impl fmt::Display for InsertOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsertOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PREPEND" => Ok(Self::Prepend),
            "APPEND" => Ok(Self::Append),
            _ => Err(ConfigError::InvalidInsertOrder(s.to_string())),
        }
    }
}

fn default_header_row() -> u32 {
    1
}

/// Layout options for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    #[serde(default)]
    pub mode: TableMode,

    #[serde(default)]
    pub insert_order: InsertOrder,

    /// Rows reserved above the table
    #[serde(default)]
    pub skip_rows: u32,

    /// Columns reserved left of the table
    #[serde(default)]
    pub skip_columns: u32,

    /// Header row of a row table, one-based, counted below `skip_rows`
    #[serde(default = "default_header_row")]
    pub header_row: u32,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            mode: TableMode::Row,
            insert_order: InsertOrder::Append,
            skip_rows: 0,
            skip_columns: 0,
            header_row: default_header_row(),
        }
    }
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: TableMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn insert_order(mut self, insert_order: InsertOrder) -> Self {
        self.insert_order = insert_order;
        self
    }

    pub fn skip_rows(mut self, skip_rows: u32) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn skip_columns(mut self, skip_columns: u32) -> Self {
        self.skip_columns = skip_columns;
        self
    }

    pub fn header_row(mut self, header_row: u32) -> Self {
        self.header_row = header_row.max(1);
        self
    }

    /// Reject the combinations no insert range exists for.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == TableMode::Column && self.insert_order == InsertOrder::Append {
            return Err(ConfigError::UnsupportedInsertOrder {
                mode: self.mode,
                order: self.insert_order,
            });
        }
        Ok(())
    }
}

/// Field type as written in a schema file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTypeName {
    #[default]
    Raw,
    Text,
    Integer,
    Float,
    Boolean,
    Json,
    /// Multi-value cell; item type comes from `items`
    Array,
    /// Nested sub-fields listed under `fields`
    Composite,
}

impl FieldTypeName {
    fn scalar(self) -> FieldType {
        match self {
            Self::Text => FieldType::Scalar(ScalarType::Text),
            Self::Integer => FieldType::Scalar(ScalarType::Integer),
            Self::Float => FieldType::Scalar(ScalarType::Float),
            Self::Boolean => FieldType::Scalar(ScalarType::Boolean),
            Self::Json => FieldType::Scalar(ScalarType::Json),
            Self::Raw | Self::Array | Self::Composite => FieldType::Raw,
        }
    }
}

/// Field as written in a schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, rename = "type")]
    pub field_type: FieldTypeName,

    /// Item type of an `array` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<FieldTypeName>,

    /// Sub-fields of a `composite` field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
}

impl FieldSchema {
    pub fn to_field_type(&self) -> FieldType {
        match self.field_type {
            FieldTypeName::Array => {
                FieldType::Array(Box::new(self.items.unwrap_or_default().scalar()))
            }
            FieldTypeName::Composite => {
                FieldType::Composite(self.fields.iter().map(FieldSchema::to_field).collect())
            }
            scalar => scalar.scalar(),
        }
    }

    pub fn to_field(&self) -> Field {
        let mut field = Field::new(&self.name).field_type(self.to_field_type());
        if let Some(header) = &self.header {
            field = field.header(header);
        }
        if self.required {
            field = field.required();
        }
        if self.primary_key {
            field = field.primary_key();
        }
        if let Some(default) = &self.default {
            field = field.default_value(default.clone());
        }
        field
    }
}

/// Table as written in a schema file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,

    #[serde(default)]
    pub options: TableOptions,

    pub fields: Vec<FieldSchema>,
}

impl TableSchema {
    pub fn to_fields(&self) -> Vec<Field> {
        self.fields.iter().map(FieldSchema::to_field).collect()
    }
}

/// A set of table definitions loaded from YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub tables: Vec<TableSchema>,
}

impl SchemaFile {
    /// Load a schema from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a schema from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let schema: SchemaFile = serde_yaml::from_str(yaml)?;
        for table in &schema.tables {
            table.options.validate()?;
        }
        Ok(schema)
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}
