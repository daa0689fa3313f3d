use sheet_types::RangeParseError;

/// Errors raised by grid store backends.
///
/// Backends return `anyhow::Result`; callers that need to branch on a
/// specific failure downcast to this type.
#[derive(Debug, thiserror::Error)]
pub enum GridStoreError {
    /// Document id does not exist
    #[error("document not found: {0}")]
    NotFound(String),

    /// Sub-grid title or id does not exist in the document
    #[error("sub-grid '{sub_grid}' not found in document {document_id}")]
    SubGridNotFound {
        document_id: String,
        sub_grid: String,
    },

    /// A sub-grid with this title already exists
    #[error("sub-grid '{0}' already exists")]
    SubGridExists(String),

    /// Range identifier could not be resolved
    #[error("invalid range: {0}")]
    InvalidRange(#[from] RangeParseError),
}

impl GridStoreError {
    /// Whether an `anyhow` error carries a [`GridStoreError::NotFound`].
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<Self>(), Some(Self::NotFound(_)))
    }
}
