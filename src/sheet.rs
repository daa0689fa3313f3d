//! Named sub-grids.

use grid_store::{Dimension, SubGridInfo};
use sheet_types::{A1Range, CellValue};

use crate::database::Database;
use crate::error::{ConfigError, Result};

/// A sub-grid of a [`Database`], added on first use.
#[derive(Debug, Clone)]
pub struct Sheet {
    database: Database,
    name: String,
}

impl Sheet {
    pub(crate) fn new(database: Database, name: String) -> Result<Self, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::MissingArgument("name"));
        }
        Ok(Self { database, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Make sure the sub-grid exists, creating the document first if needed.
    pub async fn create(&self) -> Result<SubGridInfo> {
        self.database.ensure_sub_grid(&self.name).await
    }

    /// Numeric id, once the sub-grid is known.
    pub async fn sub_grid_id(&self) -> Option<i64> {
        self.database.sub_grid(&self.name).await.map(|s| s.id)
    }

    /// Every non-empty cell of the sub-grid.
    pub async fn raw(&self, dimension: Dimension) -> Result<Vec<Vec<CellValue>>> {
        let document = self.database.create().await?;
        self.create().await?;
        let range = A1Range::sheet(self.name.as_str()).to_string();
        Ok(self
            .database
            .store()
            .read_range(&document.id, &range, dimension)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Orm;
    use grid_store::MemoryGridStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let orm = Orm::new(Arc::new(MemoryGridStore::new()));
        assert!(matches!(
            orm.database("db").sheet(""),
            Err(ConfigError::MissingArgument("name"))
        ));
    }

    #[tokio::test]
    async fn test_raw_reads_seeded_cells() {
        let store = Arc::new(MemoryGridStore::new());
        store
            .seed(
                "db",
                "Notes",
                vec![vec![json!("a"), json!("b")], vec![json!("c")]],
            )
            .await;

        let orm = Orm::new(store.clone());
        let sheet = orm.database("db").sheet("Notes").unwrap();
        assert_eq!(sheet.sub_grid_id().await, None);

        let rows = sheet.raw(Dimension::Rows).await.unwrap();
        assert_eq!(rows, vec![vec![json!("a"), json!("b")], vec![json!("c")]]);
        assert!(sheet.sub_grid_id().await.is_some());

        // The seeded sub-grid was already there.
        assert_eq!(store.stats().await.batch_updates, 0);
    }
}
