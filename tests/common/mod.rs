//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sheets_orm::{
    CellValue, Dimension, DocumentInfo, DocumentLookup, DocumentSummary, Field, GridStore,
    MemoryGridStore, Orm, ScalarType, StructuralReply, StructuralRequest,
};

pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter("sheets_orm=debug,grid_store=debug")
        .with_test_writer()
        .try_init()
        .ok(); // Ignore if already initialized
}

pub fn setup() -> (Arc<MemoryGridStore>, Orm) {
    init_logging();
    let store = Arc::new(MemoryGridStore::new());
    (store.clone(), Orm::new(store))
}

pub fn user_fields() -> Vec<Field> {
    vec![
        Field::new("id").primary_key(),
        Field::new("name").required(),
        Field::new("age").scalar(ScalarType::Integer),
    ]
}

pub fn text_row(cells: &[&str]) -> Vec<CellValue> {
    cells.iter().map(|c| CellValue::from(*c)).collect()
}

/// First cell of every row of a sub-grid, as text. Empty rows yield "".
pub async fn first_column(store: &MemoryGridStore, document_id: &str, sheet: &str) -> Vec<String> {
    store
        .snapshot(document_id, sheet)
        .await
        .unwrap_or_default()
        .iter()
        .map(|row| {
            row.first()
                .and_then(CellValue::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Memory store whose reads and document lookups can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryGridStore,
    failing: AtomicBool,
    failing_finds: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_finds(&self, failing: bool) {
        self.failing_finds.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl GridStore for FlakyStore {
    async fn read_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
    ) -> Result<Vec<Vec<CellValue>>> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("read of {range} refused");
        }
        self.inner.read_range(document_id, range, dimension).await
    }

    async fn write_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
        values: Vec<Vec<CellValue>>,
    ) -> Result<String> {
        self.inner.write_range(document_id, range, dimension, values).await
    }

    async fn append_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
        values: Vec<Vec<CellValue>>,
    ) -> Result<String> {
        self.inner.append_range(document_id, range, dimension, values).await
    }

    async fn batch_update(
        &self,
        document_id: &str,
        requests: Vec<StructuralRequest>,
    ) -> Result<Vec<StructuralReply>> {
        self.inner.batch_update(document_id, requests).await
    }

    async fn create_document(&self, title: &str) -> Result<DocumentInfo> {
        self.inner.create_document(title).await
    }

    async fn find_document(&self, lookup: &DocumentLookup) -> Result<Option<DocumentInfo>> {
        if self.failing_finds.load(Ordering::SeqCst) {
            bail!("find refused");
        }
        self.inner.find_document(lookup).await
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        self.inner.delete_document(document_id).await
    }

    async fn search_documents(&self, query: &str) -> Result<Vec<DocumentSummary>> {
        self.inner.search_documents(query).await
    }
}
