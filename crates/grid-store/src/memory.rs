//! In-memory implementation of [`GridStore`].
//!
//! Keeps every document in process memory. Range semantics follow the
//! hosted spreadsheet APIs closely enough for the record layer: reads trim
//! trailing blanks, appends land after the last non-empty row of the
//! addressed column span and insert rows, null cells in writes are skipped.

use std::ops::RangeInclusive;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sheet_types::{is_blank, A1Range, CellRef, CellValue};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::GridStoreError;
use crate::traits::GridStore;
use crate::types::{
    Dimension, DocumentInfo, DocumentLookup, DocumentSummary, StructuralReply, StructuralRequest,
    SubGridInfo,
};

/// Title of the sub-grid every new document starts with.
pub const DEFAULT_SUB_GRID: &str = "Sheet1";

/// Number of calls served per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: usize,
    pub writes: usize,
    pub appends: usize,
    pub batch_updates: usize,
    pub creates: usize,
    pub finds: usize,
    pub deletes: usize,
    pub searches: usize,
}

#[derive(Debug)]
struct SubGrid {
    info: SubGridInfo,
    /// Row-major, rows may be ragged
    cells: Vec<Vec<CellValue>>,
}

impl SubGrid {
    fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            info: SubGridInfo {
                id,
                title: title.into(),
            },
            cells: Vec::new(),
        }
    }

    fn height(&self) -> usize {
        self.cells.len()
    }

    fn width(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn get(&self, row: usize, column: usize) -> CellValue {
        self.cells
            .get(row)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn set(&mut self, row: usize, column: usize, value: CellValue) {
        if value.is_null() {
            return;
        }
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= column {
            cells.resize(column + 1, Value::Null);
        }
        cells[column] = value;
    }

    fn row_has_data(&self, row: usize, columns: RangeInclusive<usize>) -> bool {
        columns.into_iter().any(|c| !is_blank(&self.get(row, c)))
    }

    fn insert_rows(&mut self, at: usize, count: usize) {
        if at >= self.cells.len() {
            return;
        }
        for _ in 0..count {
            self.cells.insert(at, Vec::new());
        }
    }

    fn insert_columns(&mut self, at: usize, count: usize) {
        for row in &mut self.cells {
            if row.len() > at {
                for _ in 0..count {
                    row.insert(at, Value::Null);
                }
            }
        }
    }

    fn write_rect(&mut self, row0: usize, col0: usize, rect: Vec<Vec<CellValue>>) {
        for (i, row) in rect.into_iter().enumerate() {
            for (j, value) in row.into_iter().enumerate() {
                self.set(row0 + i, col0 + j, value);
            }
        }
    }
}

#[derive(Debug)]
struct Document {
    id: String,
    title: String,
    sub_grids: Vec<SubGrid>,
}

impl Document {
    fn info(&self) -> DocumentInfo {
        DocumentInfo {
            id: self.id.clone(),
            title: self.title.clone(),
            sub_grids: self.sub_grids.iter().map(|s| s.info.clone()).collect(),
        }
    }

    fn sub_grid_mut(&mut self, title: &str) -> Result<&mut SubGrid, GridStoreError> {
        let document_id = self.id.clone();
        self.sub_grids
            .iter_mut()
            .find(|s| s.info.title == title)
            .ok_or_else(|| GridStoreError::SubGridNotFound {
                document_id,
                sub_grid: title.to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct State {
    documents: Vec<Document>,
    next_sub_grid_id: i64,
    stats: StoreStats,
}

impl State {
    fn document_mut(&mut self, document_id: &str) -> Result<&mut Document, GridStoreError> {
        self.documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| GridStoreError::NotFound(document_id.to_string()))
    }

    fn allocate_sub_grid_id(&mut self) -> i64 {
        self.next_sub_grid_id += 1;
        self.next_sub_grid_id
    }
}

/// Zero-based bounds of a range; `None` ends are open.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    row0: usize,
    col0: usize,
    row1: Option<usize>,
    col1: Option<usize>,
}

impl Bounds {
    fn of(range: &A1Range) -> Self {
        let (start, end) = match (range.start, range.end) {
            (None, _) => {
                return Self {
                    row0: 0,
                    col0: 0,
                    row1: None,
                    col1: None,
                }
            }
            (Some(start), None) => (start, start),
            (Some(start), Some(end)) => (start, end),
        };
        Self {
            row0: start.row.map_or(0, |r| r as usize - 1),
            col0: start.column.unwrap_or(0),
            row1: end.row.map(|r| r as usize - 1),
            col1: end.column,
        }
    }
}

fn parse_range(range: &str) -> Result<(A1Range, String), GridStoreError> {
    let parsed: A1Range = range.parse()?;
    let sheet = parsed
        .sheet
        .clone()
        .unwrap_or_else(|| DEFAULT_SUB_GRID.to_string());
    Ok((parsed, sheet))
}

fn to_row_major(dimension: Dimension, values: Vec<Vec<CellValue>>) -> Vec<Vec<CellValue>> {
    match dimension {
        Dimension::Rows => values,
        Dimension::Columns => {
            let height = values.iter().map(Vec::len).max().unwrap_or(0);
            (0..height)
                .map(|r| {
                    values
                        .iter()
                        .map(|column| column.get(r).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect()
        }
    }
}

fn trim_trailing(mut major: Vec<Vec<CellValue>>) -> Vec<Vec<CellValue>> {
    for line in &mut major {
        while line.last().is_some_and(Value::is_null) {
            line.pop();
        }
    }
    while major.last().is_some_and(Vec::is_empty) {
        major.pop();
    }
    major
}

fn written_range(sheet: &str, row0: usize, col0: usize, rect: &[Vec<CellValue>]) -> String {
    let height = rect.len();
    let width = rect.iter().map(Vec::len).max().unwrap_or(0);
    let start = CellRef::new(col0, (row0 + 1) as u32);
    let range = if height == 0 || width == 0 {
        A1Range {
            sheet: Some(sheet.to_string()),
            start: Some(start),
            end: None,
        }
    } else {
        A1Range::between(
            sheet,
            start,
            CellRef::new(col0 + width - 1, (row0 + height) as u32),
        )
    };
    range.to_string()
}

/// Grid store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGridStore {
    state: Mutex<State>,
}

impl MemoryGridStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call counters since construction.
    pub async fn stats(&self) -> StoreStats {
        self.state.lock().await.stats
    }

    /// Place `rows` at `A1` of a sub-grid, creating the document and
    /// sub-grid when missing. Not counted in [`stats`](Self::stats).
    pub async fn seed(&self, title: &str, sheet: &str, rows: Vec<Vec<CellValue>>) -> DocumentInfo {
        let mut state = self.state.lock().await;
        let State {
            documents,
            next_sub_grid_id,
            ..
        } = &mut *state;

        let position = match documents.iter().position(|d| d.title == title) {
            Some(position) => position,
            None => {
                documents.push(Document {
                    id: uuid::Uuid::new_v4().to_string(),
                    title: title.to_string(),
                    sub_grids: Vec::new(),
                });
                documents.len() - 1
            }
        };
        let document = &mut documents[position];

        if !document.sub_grids.iter().any(|s| s.info.title == sheet) {
            *next_sub_grid_id += 1;
            document
                .sub_grids
                .push(SubGrid::new(*next_sub_grid_id, sheet));
        }
        if let Ok(grid) = document.sub_grid_mut(sheet) {
            grid.write_rect(0, 0, rows);
        }
        document.info()
    }

    /// Copy of a sub-grid's cells, row-major, without trimming.
    pub async fn snapshot(&self, document_id: &str, sheet: &str) -> Option<Vec<Vec<CellValue>>> {
        let mut state = self.state.lock().await;
        let document = state.document_mut(document_id).ok()?;
        document.sub_grid_mut(sheet).ok().map(|s| s.cells.clone())
    }
}

#[async_trait]
impl GridStore for MemoryGridStore {
    async fn read_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
    ) -> Result<Vec<Vec<CellValue>>> {
        let mut state = self.state.lock().await;
        state.stats.reads += 1;

        let (parsed, sheet) = parse_range(range)?;
        let grid = state.document_mut(document_id)?.sub_grid_mut(&sheet)?;
        let bounds = Bounds::of(&parsed);

        let (height, width) = (grid.height(), grid.width());
        if height == 0 || width == 0 {
            return Ok(Vec::new());
        }
        let last_row = bounds.row1.map_or(height - 1, |r| r.min(height - 1));
        let last_col = bounds.col1.map_or(width - 1, |c| c.min(width - 1));
        if bounds.row0 > last_row || bounds.col0 > last_col {
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<CellValue>> = (bounds.row0..=last_row)
            .map(|r| (bounds.col0..=last_col).map(|c| grid.get(r, c)).collect())
            .collect();

        let major = match dimension {
            Dimension::Rows => rows,
            Dimension::Columns => (0..=last_col - bounds.col0)
                .map(|c| rows.iter().map(|row| row[c].clone()).collect())
                .collect(),
        };

        debug!("read {range} ({dimension:?})");
        Ok(trim_trailing(major))
    }

    async fn write_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
        values: Vec<Vec<CellValue>>,
    ) -> Result<String> {
        let mut state = self.state.lock().await;
        state.stats.writes += 1;

        let (parsed, sheet) = parse_range(range)?;
        let grid = state.document_mut(document_id)?.sub_grid_mut(&sheet)?;
        let bounds = Bounds::of(&parsed);

        let rect = to_row_major(dimension, values);
        let updated = written_range(&sheet, bounds.row0, bounds.col0, &rect);
        grid.write_rect(bounds.row0, bounds.col0, rect);

        debug!("wrote {updated}");
        Ok(updated)
    }

    async fn append_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
        values: Vec<Vec<CellValue>>,
    ) -> Result<String> {
        let mut state = self.state.lock().await;
        state.stats.appends += 1;

        let (parsed, sheet) = parse_range(range)?;
        let grid = state.document_mut(document_id)?.sub_grid_mut(&sheet)?;
        let bounds = Bounds::of(&parsed);

        let rect = to_row_major(dimension, values);
        let width = rect.iter().map(Vec::len).max().unwrap_or(0);
        let span_end = bounds
            .col1
            .unwrap_or(bounds.col0)
            .max(bounds.col0 + width.saturating_sub(1));

        let target = (bounds.row0..grid.height())
            .rev()
            .find(|&r| grid.row_has_data(r, bounds.col0..=span_end))
            .map_or(bounds.row0, |r| r + 1);

        grid.insert_rows(target, rect.len());
        let updated = written_range(&sheet, target, bounds.col0, &rect);
        grid.write_rect(target, bounds.col0, rect);

        debug!("appended {updated}");
        Ok(updated)
    }

    async fn batch_update(
        &self,
        document_id: &str,
        requests: Vec<StructuralRequest>,
    ) -> Result<Vec<StructuralReply>> {
        let mut state = self.state.lock().await;
        state.stats.batch_updates += 1;
        state.document_mut(document_id)?;

        let mut replies = Vec::with_capacity(requests.len());
        for request in requests {
            match request {
                StructuralRequest::InsertDimension {
                    sub_grid_id,
                    dimension,
                    start_index,
                    end_index,
                    ..
                } => {
                    let document = state.document_mut(document_id)?;
                    let grid = document
                        .sub_grids
                        .iter_mut()
                        .find(|s| s.info.id == sub_grid_id)
                        .ok_or_else(|| GridStoreError::SubGridNotFound {
                            document_id: document_id.to_string(),
                            sub_grid: sub_grid_id.to_string(),
                        })?;
                    let count = end_index.saturating_sub(start_index);
                    match dimension {
                        Dimension::Rows => grid.insert_rows(start_index, count),
                        Dimension::Columns => grid.insert_columns(start_index, count),
                    }
                    debug!("inserted {count} {dimension:?} at {start_index} in sub-grid {sub_grid_id}");
                    replies.push(StructuralReply::InsertDimension);
                }

                StructuralRequest::AddSubGrid { title } => {
                    if state
                        .document_mut(document_id)?
                        .sub_grids
                        .iter()
                        .any(|s| s.info.title == title)
                    {
                        return Err(GridStoreError::SubGridExists(title).into());
                    }
                    let id = state.allocate_sub_grid_id();
                    let grid = SubGrid::new(id, title);
                    let info = grid.info.clone();
                    state.document_mut(document_id)?.sub_grids.push(grid);
                    debug!("added sub-grid '{}' ({})", info.title, info.id);
                    replies.push(StructuralReply::AddSubGrid(info));
                }
            }
        }
        Ok(replies)
    }

    async fn create_document(&self, title: &str) -> Result<DocumentInfo> {
        let mut state = self.state.lock().await;
        state.stats.creates += 1;

        let id = state.allocate_sub_grid_id();
        let document = Document {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            sub_grids: vec![SubGrid::new(id, DEFAULT_SUB_GRID)],
        };
        let info = document.info();
        state.documents.push(document);
        Ok(info)
    }

    async fn find_document(&self, lookup: &DocumentLookup) -> Result<Option<DocumentInfo>> {
        let mut state = self.state.lock().await;
        state.stats.finds += 1;

        let found = state.documents.iter().find(|d| match lookup {
            DocumentLookup::Id(id) => &d.id == id,
            DocumentLookup::Title(title) => &d.title == title,
        });
        Ok(found.map(Document::info))
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.stats.deletes += 1;

        let before = state.documents.len();
        state.documents.retain(|d| d.id != document_id);
        if state.documents.len() == before {
            return Err(GridStoreError::NotFound(document_id.to_string()).into());
        }
        Ok(())
    }

    async fn search_documents(&self, query: &str) -> Result<Vec<DocumentSummary>> {
        let mut state = self.state.lock().await;
        state.stats.searches += 1;

        let needle = query.to_lowercase();
        Ok(state
            .documents
            .iter()
            .filter(|d| d.title.to_lowercase().contains(&needle))
            .map(|d| DocumentSummary {
                id: d.id.clone(),
                title: d.title.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn document(store: &MemoryGridStore) -> String {
        store.create_document("db").await.unwrap().id
    }

    #[tokio::test]
    async fn test_write_then_read_rows() {
        let store = MemoryGridStore::new();
        let id = document(&store).await;

        let updated = store
            .write_range(
                &id,
                "Sheet1!A1:B2",
                Dimension::Rows,
                vec![vec![json!("id"), json!("name")], vec![json!("1"), json!("a")]],
            )
            .await
            .unwrap();
        assert_eq!(updated, "Sheet1!A1:B2");

        let rows = store
            .read_range(&id, "Sheet1", Dimension::Rows)
            .await
            .unwrap();
        assert_eq!(rows, vec![vec![json!("id"), json!("name")], vec![json!("1"), json!("a")]]);
    }

    #[tokio::test]
    async fn test_read_columns_trims_trailing_blanks() {
        let store = MemoryGridStore::new();
        let id = document(&store).await;
        store
            .write_range(
                &id,
                "Sheet1!A1",
                Dimension::Rows,
                vec![vec![json!("a"), json!("b"), Value::Null], vec![json!("c")]],
            )
            .await
            .unwrap();

        let columns = store
            .read_range(&id, "Sheet1!A1:CZ2", Dimension::Columns)
            .await
            .unwrap();
        assert_eq!(columns, vec![vec![json!("a"), json!("c")], vec![json!("b")]]);

        let empty = store
            .read_range(&id, "Sheet1!A5:CZ5", Dimension::Columns)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_write_columns_dimension() {
        let store = MemoryGridStore::new();
        let id = document(&store).await;

        let updated = store
            .write_range(
                &id,
                "Sheet1!C1:C1000",
                Dimension::Columns,
                vec![vec![json!("x"), json!("y"), json!("z")]],
            )
            .await
            .unwrap();
        assert_eq!(updated, "Sheet1!C1:C3");

        let cells = store.snapshot(&id, "Sheet1").await.unwrap();
        assert_eq!(cells[2][2], json!("z"));
    }

    #[tokio::test]
    async fn test_append_after_last_row() {
        let store = MemoryGridStore::new();
        let info = store
            .seed(
                "db",
                "Users",
                vec![
                    vec![json!("id"), json!("name")],
                    vec![json!("1"), json!("a")],
                    vec![json!("2"), json!("b")],
                ],
            )
            .await;

        let updated = store
            .append_range(
                &info.id,
                "Users!A2:B2",
                Dimension::Columns,
                vec![vec![json!("3")], vec![json!("c")]],
            )
            .await
            .unwrap();
        assert_eq!(updated, "Users!A4:B4");
        assert_eq!(store.stats().await.appends, 1);
    }

    #[tokio::test]
    async fn test_insert_rows_shifts_down() {
        let store = MemoryGridStore::new();
        let info = store
            .seed(
                "db",
                "Users",
                vec![vec![json!("id")], vec![json!("1")], vec![json!("2")]],
            )
            .await;
        let sub_grid_id = info
            .sub_grids
            .iter()
            .find(|s| s.title == "Users")
            .unwrap()
            .id;

        store
            .batch_update(
                &info.id,
                vec![StructuralRequest::InsertDimension {
                    sub_grid_id,
                    dimension: Dimension::Rows,
                    start_index: 1,
                    end_index: 2,
                    inherit_from_before: false,
                }],
            )
            .await
            .unwrap();

        let cells = store.snapshot(&info.id, "Users").await.unwrap();
        assert_eq!(cells[0], vec![json!("id")]);
        assert!(cells[1].is_empty());
        assert_eq!(cells[2], vec![json!("1")]);
    }

    #[tokio::test]
    async fn test_add_sub_grid_and_duplicates() {
        let store = MemoryGridStore::new();
        let id = document(&store).await;

        let replies = store
            .batch_update(
                &id,
                vec![StructuralRequest::AddSubGrid {
                    title: "Users".to_string(),
                }],
            )
            .await
            .unwrap();
        assert!(matches!(&replies[0], StructuralReply::AddSubGrid(info) if info.title == "Users"));

        let err = store
            .batch_update(
                &id,
                vec![StructuralRequest::AddSubGrid {
                    title: "Users".to_string(),
                }],
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let store = MemoryGridStore::new();
        let err = store.delete_document("missing").await.unwrap_err();
        assert!(GridStoreError::is_not_found(&err));
    }

    #[tokio::test]
    async fn test_find_and_search() {
        let store = MemoryGridStore::new();
        let info = store.create_document("Budget 2026").await.unwrap();
        store.create_document("Inventory").await.unwrap();

        let by_title = store
            .find_document(&DocumentLookup::Title("Budget 2026".to_string()))
            .await
            .unwrap();
        assert_eq!(by_title.map(|d| d.id), Some(info.id.clone()));

        let by_id = store
            .find_document(&DocumentLookup::Id(info.id.clone()))
            .await
            .unwrap();
        assert_eq!(by_id.unwrap().sub_grids[0].title, DEFAULT_SUB_GRID);

        let hits = store.search_documents("budget").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Budget 2026");
    }
}
