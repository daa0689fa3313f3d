//! Records: one row or one column of a table.

use std::fmt;

use serde_json::{Map, Value};
use sheet_types::is_blank;

use crate::error::{Result, ValidationError};
use crate::table::Table;

/// Where a record lives in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// One-based row number
    Row(u32),
    /// Column letters
    Column(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(row) => write!(f, "row {row}"),
            Self::Column(letter) => write!(f, "column {letter}"),
        }
    }
}

/// Field values keyed by header, plus the position once persisted.
#[derive(Clone)]
pub struct Record {
    table: Table,
    values: Map<String, Value>,
    position: Option<Position>,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table.name())
            .field("values", &self.values)
            .field("position", &self.position)
            .finish()
    }
}

pub(crate) fn into_object(values: Value) -> Result<Map<String, Value>, ValidationError> {
    match values {
        Value::Object(map) => Ok(map),
        other => Err(ValidationError::NotAnObject(other.to_string())),
    }
}

fn is_unset(value: Option<&Value>) -> bool {
    value.map_or(true, is_blank)
}

impl Record {
    pub(crate) fn new(table: Table, values: Value) -> Result<Self, ValidationError> {
        Ok(Self {
            table,
            values: into_object(values)?,
            position: None,
        })
    }

    pub(crate) fn from_scan(table: Table, values: Map<String, Value>, position: Position) -> Self {
        Self {
            table,
            values,
            position: Some(position),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Value {
        Value::Object(self.values)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn primary_key(&self) -> Option<&Value> {
        self.values.get(self.table.primary_key())
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = Some(position);
    }

    pub fn row(&self) -> Option<u32> {
        match self.position {
            Some(Position::Row(row)) => Some(row),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<&str> {
        match &self.position {
            Some(Position::Column(letter)) => Some(letter),
            _ => None,
        }
    }

    /// Merge `values` into the record without writing anything.
    pub fn set(&mut self, values: Value) -> Result<&mut Self, ValidationError> {
        self.values.extend(into_object(values)?);
        Ok(self)
    }

    /// Fill unset fields that declare a default. Producers run once each.
    pub(crate) fn apply_defaults(&mut self) {
        for field in self.table.fields() {
            let Some(default) = &field.default else {
                continue;
            };
            if self.values.get(field.key()).map_or(true, Value::is_null) {
                self.values.insert(field.key().to_string(), default.produce());
            }
        }
    }

    /// Every required field must be set. Missing, null and empty text all
    /// count as unset.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for field in self.table.fields() {
            if field.required && is_unset(self.values.get(field.key())) {
                return Err(ValidationError::RequiredField(field.name.clone()));
            }
        }
        Ok(())
    }

    /// Merge `values`, validate, and write the whole record back at its
    /// position.
    pub async fn update(&mut self, values: Value) -> Result<&mut Self> {
        self.set(values)?;
        self.validate()?;
        self.table.write_record(self).await?;
        Ok(self)
    }
}
