//! Grid documents.
//!
//! An [`Orm`] wraps a grid store handle. A [`Database`] is one grid document,
//! looked up by title or id and created on first use. Lookup and creation
//! each run once per `Database` (clones share the state); `destroy` deletes
//! the document and forgets both so the next operation starts over.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use grid_store::{
    DocumentInfo, DocumentLookup, GridStore, GridStoreError, StructuralReply, StructuralRequest,
    SubGridInfo,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{TableOptions, TableSchema};
use crate::error::{ConfigError, Result};
use crate::field::Field;
use crate::sheet::Sheet;
use crate::sync_state::{SyncCell, SyncStatus};
use crate::table::Table;

/// Entry point bound to a grid store.
#[derive(Clone)]
pub struct Orm {
    store: Arc<dyn GridStore>,
}

impl Orm {
    pub fn new(store: Arc<dyn GridStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn GridStore> {
        &self.store
    }

    /// A document identified by title. Nothing is fetched until first use.
    pub fn database(&self, name: impl Into<String>) -> Database {
        Database::new(self.store.clone(), name.into(), None)
    }

    /// A document identified by id, e.g. from a previous search.
    pub fn database_by_id(&self, id: impl Into<String>, name: impl Into<String>) -> Database {
        Database::new(self.store.clone(), name.into(), Some(id.into()))
    }

    /// Documents whose title contains `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<Database>> {
        let hits = self.store.search_documents(query).await?;
        debug!("search '{query}' matched {} documents", hits.len());
        Ok(hits
            .into_iter()
            .map(|hit| self.database_by_id(hit.id, hit.title))
            .collect())
    }
}

struct DatabaseInner {
    store: Arc<dyn GridStore>,
    name: String,
    id: Option<String>,
    found: SyncCell<Option<DocumentInfo>>,
    created: SyncCell<DocumentInfo>,
    sub_grids: Mutex<HashMap<String, SubGridInfo>>,
    generation: AtomicU64,
}

/// One grid document.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .finish()
    }
}

impl Database {
    fn new(store: Arc<dyn GridStore>, name: String, id: Option<String>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                store,
                name,
                id,
                found: SyncCell::default(),
                created: SyncCell::default(),
                sub_grids: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn store(&self) -> &Arc<dyn GridStore> {
        &self.inner.store
    }

    /// Creation state of the document.
    pub fn status(&self) -> SyncStatus {
        self.inner.created.status()
    }

    /// Bumped every time the document is destroyed. Tables compare it to
    /// the value their layout was computed at.
    pub(crate) fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Id of the document, if it has been found or created.
    pub async fn id(&self) -> Option<String> {
        if let Some(document) = self.inner.created.get().await {
            return Some(document.id);
        }
        self.inner.found.get().await.flatten().map(|d| d.id)
    }

    /// Look the document up by id (when known) or title. Runs once.
    pub async fn find(&self) -> Result<Option<DocumentInfo>> {
        self.inner
            .found
            .get_or_sync(|| async {
                let lookup = match &self.inner.id {
                    Some(id) => DocumentLookup::Id(id.clone()),
                    None => DocumentLookup::Title(self.inner.name.clone()),
                };
                let found = self.inner.store.find_document(&lookup).await?;
                match &found {
                    Some(document) => debug!("Database found: {} ({})", document.title, document.id),
                    None => debug!("Database not found: {lookup:?}"),
                }
                Ok(found)
            })
            .await
    }

    /// Find the document, creating it when absent. Runs once.
    pub async fn create(&self) -> Result<DocumentInfo> {
        self.inner
            .created
            .get_or_sync(|| async {
                let document = match self.find().await? {
                    Some(document) => document,
                    None => {
                        let document = self.inner.store.create_document(&self.inner.name).await?;
                        info!("Database created: {}", document.id);
                        document
                    }
                };

                let mut sub_grids = self.inner.sub_grids.lock().await;
                sub_grids.clear();
                sub_grids.extend(
                    document
                        .sub_grids
                        .iter()
                        .map(|s| (s.title.clone(), s.clone())),
                );
                Ok(document)
            })
            .await
    }

    /// Delete the document and forget everything memoized about it.
    ///
    /// Deleting a document the store no longer knows about is not an error.
    /// The memoized state is forgotten even when the lookup or the delete
    /// fails, so the next operation starts from scratch.
    pub async fn destroy(&self) -> Result<()> {
        let outcome = self.delete_document().await;
        self.reset_sync().await;
        outcome
    }

    async fn delete_document(&self) -> Result<()> {
        let document = match self.inner.created.get().await {
            Some(document) => Some(document),
            // A failed lookup has nothing to delete.
            None if self.inner.found.status() == SyncStatus::Failed => None,
            None => self.find().await?,
        };
        let Some(document) = document else {
            return Ok(());
        };

        match self.inner.store.delete_document(&document.id).await {
            Ok(()) => info!("Database deleted: {}", document.id),
            Err(e) if GridStoreError::is_not_found(&e) => {
                warn!("Database {} was already deleted", document.id)
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Forget the memoized lookup, creation and sub-grids without touching
    /// the store. Tables of this database re-run their DDL on next use.
    pub async fn reset_sync(&self) {
        self.inner.found.reset().await;
        self.inner.created.reset().await;
        self.inner.sub_grids.lock().await.clear();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Cached sub-grid metadata, without touching the store.
    pub async fn sub_grid(&self, title: &str) -> Option<SubGridInfo> {
        self.inner.sub_grids.lock().await.get(title).cloned()
    }

    /// Make sure a sub-grid exists, adding it when missing.
    pub(crate) async fn ensure_sub_grid(&self, title: &str) -> Result<SubGridInfo> {
        let document = self.create().await?;

        let mut sub_grids = self.inner.sub_grids.lock().await;
        if let Some(info) = sub_grids.get(title) {
            return Ok(info.clone());
        }

        let replies = self
            .inner
            .store
            .batch_update(
                &document.id,
                vec![StructuralRequest::AddSubGrid {
                    title: title.to_string(),
                }],
            )
            .await?;
        let info = replies
            .into_iter()
            .find_map(|reply| match reply {
                StructuralReply::AddSubGrid(info) => Some(info),
                _ => None,
            })
            .ok_or_else(|| anyhow!("grid store did not report the added sub-grid '{title}'"))?;

        info!("Sheet created: {} ({})", info.title, info.id);
        sub_grids.insert(title.to_string(), info.clone());
        Ok(info)
    }

    pub fn sheet(&self, name: impl Into<String>) -> Result<Sheet, ConfigError> {
        Sheet::new(self.clone(), name.into())
    }

    /// Define a table stored in the sub-grid named `name`.
    pub fn table(
        &self,
        name: impl Into<String>,
        fields: Vec<Field>,
        options: TableOptions,
    ) -> Result<Table, ConfigError> {
        Table::new(self.clone(), name.into(), fields, options)
    }

    /// Define a table from a schema file entry.
    pub fn table_from_schema(&self, schema: &TableSchema) -> Result<Table, ConfigError> {
        self.table(schema.name.clone(), schema.to_fields(), schema.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_store::MemoryGridStore;

    fn orm() -> (Arc<MemoryGridStore>, Orm) {
        let store = Arc::new(MemoryGridStore::new());
        (store.clone(), Orm::new(store))
    }

    #[tokio::test]
    async fn test_create_runs_once() {
        let (store, orm) = orm();
        let db = orm.database("inventory");

        let first = db.create().await.unwrap();
        let second = db.create().await.unwrap();
        assert_eq!(first.id, second.id);

        let stats = store.stats().await;
        assert_eq!(stats.finds, 1);
        assert_eq!(stats.creates, 1);
        assert_eq!(db.status(), SyncStatus::Synced);
        assert_eq!(db.id().await, Some(first.id));
    }

    #[tokio::test]
    async fn test_create_reuses_existing_document() {
        let (store, orm) = orm();
        let existing = store.create_document("inventory").await.unwrap();

        let document = orm.database("inventory").create().await.unwrap();
        assert_eq!(document.id, existing.id);
        assert_eq!(store.stats().await.creates, 1);
    }

    #[tokio::test]
    async fn test_concurrent_create_is_deduplicated() {
        let (store, orm) = orm();
        let db = orm.database("inventory");
        let other = db.clone();

        let (a, b, c) = tokio::join!(db.create(), other.create(), db.create());
        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert!(c.is_ok());
        assert_eq!(store.stats().await.creates, 1);
    }

    #[tokio::test]
    async fn test_ensure_sub_grid_adds_once() {
        let (store, orm) = orm();
        let db = orm.database("inventory");

        let first = db.ensure_sub_grid("Items").await.unwrap();
        let second = db.ensure_sub_grid("Items").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.stats().await.batch_updates, 1);

        // The default sub-grid is known from creation.
        assert!(db.sub_grid("Sheet1").await.is_some());
    }

    #[tokio::test]
    async fn test_destroy_resets_state() {
        let (store, orm) = orm();
        let db = orm.database("inventory");

        let first = db.create().await.unwrap();
        db.destroy().await.unwrap();
        assert_eq!(db.status(), SyncStatus::Unsynced);
        assert_eq!(db.generation(), 1);
        assert!(db.sub_grid("Sheet1").await.is_none());

        let second = db.create().await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.stats().await.creates, 2);
    }

    #[tokio::test]
    async fn test_destroy_tolerates_missing_document() {
        let (store, orm) = orm();
        let db = orm.database("inventory");
        let document = db.create().await.unwrap();

        // Someone else deleted it first.
        store.delete_document(&document.id).await.unwrap();
        db.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn test_destroy_without_document_is_noop() {
        let (store, orm) = orm();
        orm.database("never-created").destroy().await.unwrap();
        assert_eq!(store.stats().await.deletes, 0);
    }

    #[tokio::test]
    async fn test_search_returns_databases_by_id() {
        let (store, orm) = orm();
        let document = store.create_document("Quarterly report").await.unwrap();
        store.create_document("Inventory").await.unwrap();

        let hits = orm.search("report").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "Quarterly report");

        let found = hits[0].find().await.unwrap().unwrap();
        assert_eq!(found.id, document.id);
    }
}
