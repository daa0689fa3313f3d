//! Request and response types exchanged with a grid store.

use serde::{Deserialize, Serialize};

/// Major dimension of a value matrix.
///
/// With `Rows`, `values[i]` is the i-th row of the range; with `Columns`,
/// `values[i]` is the i-th column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Dimension {
    Rows,
    Columns,
}

/// A named sub-grid inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGridInfo {
    /// Backend-assigned numeric id, used by structural requests
    pub id: i64,
    /// Sub-grid title, used in A1 ranges
    pub title: String,
}

/// Full description of a grid document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub title: String,
    pub sub_grids: Vec<SubGridInfo>,
}

/// Search hit returned by [`GridStore::search_documents`](crate::GridStore::search_documents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
}

/// How to locate an existing document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLookup {
    Id(String),
    Title(String),
}

/// Structural change applied by a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralRequest {
    /// Insert blank rows or columns in `[start_index, end_index)` (zero-based).
    InsertDimension {
        sub_grid_id: i64,
        dimension: Dimension,
        start_index: usize,
        end_index: usize,
        /// Copy formatting from the row/column before the insertion point
        inherit_from_before: bool,
    },

    /// Add a new named sub-grid.
    AddSubGrid { title: String },
}

/// Per-request reply of a batch update, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralReply {
    InsertDimension,
    AddSubGrid(SubGridInfo),
}
