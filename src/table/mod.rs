//! Tables: a schema bound to a sub-grid.
//!
//! A table lays records out in one of two orientations. In [`TableMode::Row`]
//! a header row names the fields and each following row is a record; in
//! [`TableMode::Column`] each field owns a fixed row and each column is a
//! record. The layout is synchronized with the grid once (the DDL step:
//! create the document and sub-grid, add missing headers) and reused by
//! every record operation until the database is destroyed or
//! [`Table::reset_sync`] is called.

mod column;
mod row;

pub use column::{ColumnLayout, ResolvedRow};
pub use row::{ResolvedColumn, RowLayout};

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use grid_store::{Dimension, StructuralRequest};
use serde_json::Value;
use sheet_types::{
    column_index, column_letter, terminal_column, terminal_row, A1Range, CellRef, RangeParseError,
};
use tracing::{debug, info};

use crate::config::{InsertOrder, TableMode, TableOptions};
use crate::database::Database;
use crate::error::{ConfigError, OrmError, Result, ValidationError, ValueSetExistsError};
use crate::field::Field;
use crate::record::{into_object, Position, Record};
use crate::sheet::Sheet;
use crate::sync_state::{SyncCell, SyncStatus};

/// Synchronized grid layout of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Row(RowLayout),
    Column(ColumnLayout),
}

impl Layout {
    pub fn first_field(&self) -> Option<&str> {
        match self {
            Self::Row(layout) => layout.first_field(),
            Self::Column(layout) => layout.first_field(),
        }
    }

    pub fn last_field(&self) -> Option<&str> {
        match self {
            Self::Row(layout) => layout.last_field(),
            Self::Column(layout) => layout.last_field(),
        }
    }
}

struct TableInner {
    sheet: Sheet,
    options: TableOptions,
    fields: Vec<Field>,
    primary_key: String,
    /// Layout plus the database generation it was computed at
    layout: SyncCell<(u64, Arc<Layout>)>,
}

/// A typed view over one sub-grid. Clones share the synchronized layout.
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name())
            .field("options", &self.inner.options)
            .field("fields", &self.inner.fields)
            .finish()
    }
}

impl Table {
    pub(crate) fn new(
        database: Database,
        name: String,
        mut fields: Vec<Field>,
        mut options: TableOptions,
    ) -> Result<Self, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::MissingArgument("name"));
        }
        if fields.is_empty() {
            return Err(ConfigError::MissingArgument("fields"));
        }
        options.validate()?;
        options.header_row = options.header_row.max(1);

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.key()) {
                return Err(ConfigError::DuplicateField {
                    table: name,
                    field: field.key().to_string(),
                });
            }
        }

        let keys: Vec<String> = fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.key().to_string())
            .collect();
        let primary_key = match keys.len() {
            0 => return Err(ConfigError::MissingPrimaryKey(name)),
            1 => keys[0].clone(),
            _ => {
                return Err(ConfigError::DuplicatePrimaryKey {
                    table: name,
                    fields: keys,
                })
            }
        };
        for field in fields.iter_mut().filter(|f| f.primary_key) {
            field.required = true;
        }

        let sheet = Sheet::new(database, name)?;
        Ok(Self {
            inner: Arc::new(TableInner {
                sheet,
                options,
                fields,
                primary_key,
                layout: SyncCell::default(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        self.inner.sheet.name()
    }

    pub fn sheet(&self) -> &Sheet {
        &self.inner.sheet
    }

    pub fn database(&self) -> &Database {
        self.inner.sheet.database()
    }

    pub fn options(&self) -> &TableOptions {
        &self.inner.options
    }

    pub fn mode(&self) -> TableMode {
        self.inner.options.mode
    }

    pub fn fields(&self) -> &[Field] {
        &self.inner.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.inner.fields.iter().find(|f| f.key() == key)
    }

    /// Key of the primary key field.
    pub fn primary_key(&self) -> &str {
        &self.inner.primary_key
    }

    /// One-based row number of the header row.
    pub(crate) fn header_row_number(&self) -> u32 {
        self.inner.options.skip_rows + self.inner.options.header_row
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.inner.layout.status()
    }

    /// Forget the synchronized layout so the next operation syncs again.
    pub async fn reset_sync(&self) {
        self.inner.layout.reset().await;
    }

    /// Synchronize the table with the grid, once.
    ///
    /// Concurrent callers share one synchronization. A failure is returned
    /// to every caller until [`reset_sync`](Self::reset_sync).
    pub async fn ddl(&self) -> Result<Arc<Layout>> {
        let generation = self.database().generation();
        let (synced_at, layout) = self
            .inner
            .layout
            .get_or_sync(|| self.synchronize(generation))
            .await?;
        if synced_at == generation {
            return Ok(layout);
        }

        debug!("Database of table '{}' was recreated; syncing again", self.name());
        self.inner.layout.reset().await;
        let (_, layout) = self
            .inner
            .layout
            .get_or_sync(|| self.synchronize(generation))
            .await?;
        Ok(layout)
    }

    async fn synchronize(&self, generation: u64) -> Result<(u64, Arc<Layout>)> {
        let document = self.database().create().await?;
        self.inner.sheet.create().await?;

        let layout = match self.mode() {
            TableMode::Row => Layout::Row(row::synchronize(self, &document.id).await?),
            TableMode::Column => Layout::Column(ColumnLayout::resolve(
                &self.inner.fields,
                self.inner.options.skip_rows,
            )),
        };
        debug!("Table '{}' synchronized: {layout:?}", self.name());
        Ok((generation, Arc::new(layout)))
    }

    /// Letters and header names of every header column. Empty for column
    /// tables.
    pub async fn columns(&self) -> Result<Vec<(String, String)>> {
        Ok(match self.ddl().await?.as_ref() {
            Layout::Row(layout) => layout.columns(),
            Layout::Column(_) => Vec::new(),
        })
    }

    async fn document_id(&self) -> Result<String> {
        Ok(self.database().create().await?.id)
    }

    /// A single column from `skip_rows + 1` down to the fixed window end,
    /// e.g. `Places!C2:C1000`.
    fn column_span(&self, column: usize) -> String {
        A1Range::between(
            self.name(),
            CellRef::new(column, self.inner.options.skip_rows + 1),
            CellRef::new(column, row::ROW_WINDOW_END),
        )
        .to_string()
    }

    /// Validate and write a new record.
    ///
    /// Fails with [`OrmError::ValueSetExists`] when a record with the same
    /// primary key is already stored; nothing is written in that case.
    pub async fn insert(&self, values: Value) -> Result<Record> {
        let mut record = Record::new(self.clone(), values)?;
        record.apply_defaults();
        record.validate()?;

        let layout = self.ddl().await?;
        let key = record.primary_key().cloned().unwrap_or(Value::Null);
        if self.find_by_pk(key.clone()).await?.is_some() {
            return Err(ValueSetExistsError {
                mode: self.mode(),
                table: self.name().to_string(),
                key,
            }
            .into());
        }

        let document_id = self.document_id().await?;
        let position = match self.inner.options.insert_order {
            InsertOrder::Append => self.append(&document_id, &layout, &record).await?,
            InsertOrder::Prepend => self.prepend(&document_id, &layout, &record).await?,
        };
        info!("{} inserted into '{}' at {position}", self.mode(), self.name());

        record.set_position(position);
        Ok(record)
    }

    async fn append(&self, document_id: &str, layout: &Layout, record: &Record) -> Result<Position> {
        let Layout::Row(layout) = layout else {
            return Err(ConfigError::UnsupportedInsertOrder {
                mode: self.mode(),
                order: InsertOrder::Append,
            }
            .into());
        };

        let first_data_row = layout.header_row + 1;
        let range = layout.row_span(self.name(), first_data_row, first_data_row);
        let updated = self
            .database()
            .store()
            .append_range(document_id, &range, Dimension::Columns, layout.encode(record))
            .await?;
        Ok(Position::Row(terminal_row(&updated)?))
    }

    async fn prepend(&self, document_id: &str, layout: &Layout, record: &Record) -> Result<Position> {
        let sub_grid_id = self.inner.sheet.create().await?.id;
        let store = self.database().store();

        match layout {
            Layout::Row(layout) => {
                // Blank row directly under the header.
                let at = layout.header_row as usize;
                store
                    .batch_update(
                        document_id,
                        vec![StructuralRequest::InsertDimension {
                            sub_grid_id,
                            dimension: Dimension::Rows,
                            start_index: at,
                            end_index: at + 1,
                            inherit_from_before: false,
                        }],
                    )
                    .await?;

                let row = layout.header_row + 1;
                let range = layout.row_span(self.name(), row, row);
                let updated = store
                    .write_range(document_id, &range, Dimension::Columns, layout.encode(record))
                    .await?;
                Ok(Position::Row(terminal_row(&updated)?))
            }
            Layout::Column(_) => {
                let at = self.inner.options.skip_columns as usize;
                store
                    .batch_update(
                        document_id,
                        vec![StructuralRequest::InsertDimension {
                            sub_grid_id,
                            dimension: Dimension::Columns,
                            start_index: at,
                            end_index: at + 1,
                            inherit_from_before: false,
                        }],
                    )
                    .await?;

                let range = self.column_span(at);
                let cells = column::flatten(&self.inner.fields, record.values());
                let updated = store
                    .write_range(document_id, &range, Dimension::Columns, vec![cells])
                    .await?;
                Ok(Position::Column(terminal_column(&updated)?))
            }
        }
    }

    /// Insert several records concurrently. Every insert runs to
    /// completion; the first failure, if any, is returned.
    pub async fn insert_many(&self, values: Vec<Value>) -> Result<Vec<Record>> {
        join_all(values.into_iter().map(|v| self.insert(v)))
            .await
            .into_iter()
            .collect()
    }

    /// Update the record with the same primary key, or insert a new one.
    pub async fn upsert(&self, values: Value) -> Result<Record> {
        let values = into_object(values)?;
        let key = match values.get(self.primary_key()) {
            Some(key) if !sheet_types::is_blank(key) => key.clone(),
            _ => {
                return Err(ValidationError::MissingPrimaryKey(self.primary_key().to_string()).into())
            }
        };

        match self.find_by_pk(key).await? {
            Some(mut record) => {
                record.update(Value::Object(values)).await?;
                Ok(record)
            }
            None => self.insert(Value::Object(values)).await,
        }
    }

    /// Every record, in grid order.
    pub async fn find_all(&self) -> Result<Vec<Record>> {
        let layout = self.ddl().await?;
        let document_id = self.document_id().await?;
        let store = self.database().store();
        let range = A1Range::sheet(self.name()).to_string();

        let records: Vec<Record> = match layout.as_ref() {
            Layout::Row(layout) => {
                let rows = store.read_range(&document_id, &range, Dimension::Rows).await?;
                rows.iter()
                    .enumerate()
                    .skip(layout.header_row as usize)
                    .map(|(index, row)| {
                        Record::from_scan(
                            self.clone(),
                            layout.decode(&self.inner.fields, row),
                            Position::Row(index as u32 + 1),
                        )
                    })
                    .collect()
            }
            Layout::Column(_) => {
                let columns = store
                    .read_range(&document_id, &range, Dimension::Columns)
                    .await?;
                columns
                    .iter()
                    .enumerate()
                    .skip(self.inner.options.skip_columns as usize)
                    .map(|(index, cells)| {
                        Record::from_scan(
                            self.clone(),
                            column::decode(&self.inner.fields, self.inner.options.skip_rows, cells),
                            Position::Column(column_letter(index)),
                        )
                    })
                    .collect()
            }
        };
        Ok(records)
    }

    /// The record whose primary key equals `key`.
    ///
    /// `key` goes through the primary key's coercion first, so `1` and `"1"`
    /// find the same record once read back from the grid.
    pub async fn find_by_pk(&self, key: impl Into<Value>) -> Result<Option<Record>> {
        let key = self.coerce_key(key.into());
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .find(|record| record.primary_key() == Some(&key)))
    }

    fn coerce_key(&self, key: Value) -> Value {
        match self.field(self.primary_key()) {
            Some(field) if !key.is_null() => field.field_type.coerce(&key),
            _ => key,
        }
    }

    /// Write every value of a persisted record back to its position.
    pub(crate) async fn write_record(&self, record: &Record) -> Result<()> {
        let not_persisted = || OrmError::NotPersisted {
            table: self.name().to_string(),
            mode: self.mode(),
        };
        let position = record.position().ok_or_else(not_persisted)?;

        let layout = self.ddl().await?;
        let document_id = self.document_id().await?;
        let store = self.database().store();

        match (layout.as_ref(), position) {
            (Layout::Row(layout), Position::Row(row)) => {
                let range = layout.row_span(self.name(), *row, *row);
                store
                    .write_range(&document_id, &range, Dimension::Columns, layout.encode(record))
                    .await?;
            }
            (Layout::Column(_), Position::Column(letter)) => {
                let index = column_index(letter).ok_or_else(|| RangeParseError::InvalidCell {
                    range: letter.clone(),
                    cell: letter.clone(),
                })?;
                let cells = column::flatten(&self.inner.fields, record.values());
                store
                    .write_range(&document_id, &self.column_span(index), Dimension::Columns, vec![cells])
                    .await?;
            }
            _ => return Err(not_persisted()),
        }

        info!("{} updated in '{}' at {position}", self.mode(), self.name());
        Ok(())
    }
}
