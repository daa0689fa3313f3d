//! Column-mode layout: one record per column, fields on fixed rows.
//!
//! Composite fields expand into their sub-fields, depth first, so every leaf
//! value gets its own row.

use serde_json::{Map, Value};
use sheet_types::{join_multi_value, CellValue};

use crate::field::{encode_cell, Field, FieldType};

/// A leaf field and the row it is stored on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRow {
    /// Keys from the top-level field down to the leaf
    pub path: Vec<String>,
    /// Zero-based row index
    pub index: usize,
    pub first: bool,
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub rows: Vec<ResolvedRow>,
}

fn assign(fields: &[Field], prefix: &[String], next: &mut usize, out: &mut Vec<ResolvedRow>) {
    for field in fields {
        let mut path = prefix.to_vec();
        path.push(field.key().to_string());
        match &field.field_type {
            FieldType::Composite(sub) => assign(sub, &path, next, out),
            _ => {
                out.push(ResolvedRow {
                    path,
                    index: *next,
                    first: false,
                    last: false,
                });
                *next += 1;
            }
        }
    }
}

impl ColumnLayout {
    pub(crate) fn resolve(fields: &[Field], skip_rows: u32) -> Self {
        let mut rows = Vec::new();
        let mut next = skip_rows as usize;
        assign(fields, &[], &mut next, &mut rows);

        if let Some(first) = rows.first_mut() {
            first.first = true;
        }
        if let Some(last) = rows.last_mut() {
            last.last = true;
        }
        Self { rows }
    }

    /// Row of a leaf, addressed by its key path.
    pub fn row_of(&self, path: &[&str]) -> Option<usize> {
        self.rows
            .iter()
            .find(|r| r.path.iter().map(String::as_str).eq(path.iter().copied()))
            .map(|r| r.index)
    }

    pub fn first_field(&self) -> Option<&str> {
        self.rows.first().and_then(|r| r.path.first()).map(String::as_str)
    }

    pub fn last_field(&self) -> Option<&str> {
        self.rows.last().and_then(|r| r.path.first()).map(String::as_str)
    }
}

/// Leaf values in row order. Arrays are comma-joined; missing values are
/// null, which leaves the cell untouched on write.
pub(crate) fn flatten(fields: &[Field], values: &Map<String, Value>) -> Vec<CellValue> {
    let mut cells = Vec::new();
    for field in fields {
        let value = values.get(field.key()).cloned().unwrap_or(Value::Null);
        match &field.field_type {
            FieldType::Composite(sub) => {
                let nested = value.as_object().cloned().unwrap_or_default();
                cells.extend(flatten(sub, &nested));
            }
            FieldType::Array(_) => cells.push(join_multi_value(&value)),
            _ => cells.push(encode_cell(&value)),
        }
    }
    cells
}

fn read_fields(fields: &[Field], cells: &[CellValue], row: &mut usize) -> Map<String, Value> {
    let mut values = Map::new();
    for field in fields {
        match &field.field_type {
            FieldType::Composite(sub) => {
                let nested = read_fields(sub, cells, row);
                if nested.values().any(|v| !v.is_null()) {
                    values.insert(field.key().to_string(), Value::Object(nested));
                }
            }
            field_type => {
                if let Some(cell) = cells.get(*row) {
                    let value = if cell.is_null() {
                        Value::Null
                    } else {
                        field_type.coerce(cell)
                    };
                    values.insert(field.key().to_string(), value);
                }
                *row += 1;
            }
        }
    }
    values
}

/// Rebuild field values from one grid column. Composites are reassembled
/// from their leaf rows and left out when every leaf is empty.
pub(crate) fn decode(fields: &[Field], skip_rows: u32, cells: &[CellValue]) -> Map<String, Value> {
    let mut row = skip_rows as usize;
    read_fields(fields, cells, &mut row)
}
