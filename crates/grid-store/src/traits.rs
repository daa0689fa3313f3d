//! GridStore trait definition.

use anyhow::Result;
use sheet_types::CellValue;

use crate::types::{
    Dimension, DocumentInfo, DocumentLookup, DocumentSummary, StructuralReply, StructuralRequest,
};

/// Capability set the record layer needs from a grid backend.
///
/// Ranges are A1 identifiers (`Sheet!A1:C3`). Implementations own transport,
/// authentication and retry policy; the record layer never retries.
///
/// Write and append return the range that was actually written. Its terminal
/// cell is how callers learn the row number or column letter a record landed
/// on, so implementations must report it in A1 form.
#[async_trait::async_trait]
pub trait GridStore: Send + Sync {
    /// Read a range. Trailing empty cells and trailing empty rows/columns
    /// are omitted; the result may be empty.
    async fn read_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
    ) -> Result<Vec<Vec<CellValue>>>;

    /// Write values starting at the top-left cell of `range`.
    ///
    /// Null cells leave the existing cell untouched.
    async fn write_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
        values: Vec<Vec<CellValue>>,
    ) -> Result<String>;

    /// Append values after the last non-empty row of the table found at
    /// `range`, inserting new rows so the grid grows to fit.
    async fn append_range(
        &self,
        document_id: &str,
        range: &str,
        dimension: Dimension,
        values: Vec<Vec<CellValue>>,
    ) -> Result<String>;

    /// Apply structural changes in order.
    async fn batch_update(
        &self,
        document_id: &str,
        requests: Vec<StructuralRequest>,
    ) -> Result<Vec<StructuralReply>>;

    /// Create a new document with a single default sub-grid.
    async fn create_document(&self, title: &str) -> Result<DocumentInfo>;

    /// Look up a document by id or title. Returns `None` if absent.
    async fn find_document(&self, lookup: &DocumentLookup) -> Result<Option<DocumentInfo>>;

    /// Delete a document. Fails with
    /// [`GridStoreError::NotFound`](crate::GridStoreError::NotFound) when the
    /// id is unknown.
    async fn delete_document(&self, document_id: &str) -> Result<()>;

    /// Search documents whose title contains `query`.
    async fn search_documents(&self, query: &str) -> Result<Vec<DocumentSummary>>;
}
