//! Row-mode layout: headers on one row, one record per row below it.

use grid_store::Dimension;
use serde_json::{Map, Value};
use sheet_types::{cell_text, column_letter, A1Range, CellRef, CellValue};
use tracing::info;

use crate::error::Result;
use crate::field::{encode_cell, Field};
use crate::record::Record;

use super::Table;

/// Header cells scanned on sync: `A` through `CZ`.
pub(crate) const HEADER_SCAN_COLUMNS: usize = 104;

/// Last row covered by a single-column data range.
pub(crate) const ROW_WINDOW_END: u32 = 1000;

/// A declared field matched to its header column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub key: String,
    /// Zero-based column index
    pub index: usize,
    pub letter: String,
    /// Header cell, e.g. `C1`
    pub location: String,
    pub first: bool,
    pub last: bool,
}

/// Header state of a row table after sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    /// One-based row number of the header row
    pub header_row: u32,
    /// Every header cell, in column order
    pub headers: Vec<String>,
    /// Declared fields, in column order
    pub columns: Vec<ResolvedColumn>,
}

impl RowLayout {
    pub(crate) fn resolve(header_row: u32, existing: Vec<String>, missing: Vec<String>, fields: &[Field]) -> Self {
        let mut headers = existing;
        headers.extend(missing);

        // first/last describe the header line, not just the declared fields.
        let last_index = headers.len().saturating_sub(1);
        let columns: Vec<ResolvedColumn> = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| fields.iter().any(|f| f.key() == header.as_str()))
            .map(|(index, header)| {
                let letter = column_letter(index);
                ResolvedColumn {
                    key: header.clone(),
                    index,
                    location: format!("{letter}{header_row}"),
                    letter,
                    first: index == 0,
                    last: index == last_index,
                }
            })
            .collect();

        Self {
            header_row,
            headers,
            columns,
        }
    }

    pub fn column_of(&self, key: &str) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// The declared field stored at a zero-based column index.
    pub fn field_at(&self, index: usize) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.index == index)
    }

    pub fn first_field(&self) -> Option<&str> {
        self.columns.first().map(|c| c.key.as_str())
    }

    pub fn last_field(&self) -> Option<&str> {
        self.columns.last().map(|c| c.key.as_str())
    }

    /// Column letters paired with the header they hold.
    pub fn columns(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .enumerate()
            .map(|(index, header)| (column_letter(index), header.clone()))
            .collect()
    }

    /// One row spanning every header column, e.g. `Users!A5:D5`.
    pub(crate) fn row_span(&self, sheet: &str, first_row: u32, last_row: u32) -> String {
        let last_column = self.headers.len().saturating_sub(1);
        A1Range::between(
            sheet,
            CellRef::new(0, first_row),
            CellRef::new(last_column, last_row),
        )
        .to_string()
    }

    /// Record values laid out per header column, one single-cell column each.
    pub(crate) fn encode(&self, record: &Record) -> Vec<Vec<CellValue>> {
        self.headers
            .iter()
            .map(|header| {
                let cell = match self.column_of(header) {
                    Some(_) => record.get(header).map_or(Value::Null, encode_cell),
                    None => Value::Null,
                };
                vec![cell]
            })
            .collect()
    }

    /// Map one grid row to field values, coercing non-null cells.
    pub(crate) fn decode(&self, fields: &[Field], row: &[CellValue]) -> Map<String, Value> {
        let mut values = Map::new();
        for (index, cell) in row.iter().enumerate() {
            let Some(column) = self.field_at(index) else {
                continue;
            };
            let Some(field) = fields.iter().find(|f| f.key() == column.key) else {
                continue;
            };
            let value = if cell.is_null() {
                Value::Null
            } else {
                field.field_type.coerce(cell)
            };
            values.insert(column.key.clone(), value);
        }
        values
    }
}

/// Declared headers not yet present, in declaration order.
pub(crate) fn missing_headers(existing: &[String], fields: &[Field]) -> Vec<String> {
    fields
        .iter()
        .map(|f| f.key().to_string())
        .filter(|key| !existing.contains(key))
        .collect()
}

/// Read the header row, add any missing headers after the existing ones and
/// resolve field columns.
pub(crate) async fn synchronize(table: &Table, document_id: &str) -> Result<RowLayout> {
    let header_row = table.header_row_number();
    let sheet = table.name();
    let store = table.database().store();

    let scan = A1Range::between(
        sheet,
        CellRef::new(0, header_row),
        CellRef::new(HEADER_SCAN_COLUMNS - 1, header_row),
    );
    let existing: Vec<String> = store
        .read_range(document_id, &scan.to_string(), Dimension::Columns)
        .await?
        .iter()
        .map(|column| column.first().map(cell_text).unwrap_or_default())
        .collect();

    let missing = missing_headers(&existing, table.fields());
    if !missing.is_empty() {
        let range = A1Range::between(
            sheet,
            CellRef::new(existing.len(), header_row),
            CellRef::new(existing.len() + missing.len() - 1, header_row),
        );
        let values = missing
            .iter()
            .map(|header| vec![Value::String(header.clone())])
            .collect();
        store
            .write_range(document_id, &range.to_string(), Dimension::Columns, values)
            .await?;
        info!("Added headers {missing:?} to table '{sheet}'");
    }

    Ok(RowLayout::resolve(header_row, existing, missing, table.fields()))
}
