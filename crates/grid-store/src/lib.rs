//! Grid store abstraction for sheets-orm.
//!
//! This crate defines the `GridStore` trait the record layer talks to, the
//! request/response types it exchanges, and `MemoryGridStore`, an in-process
//! backend used by tests and by embedders that do not need a remote service.
//!
//! Remote backends (hosted spreadsheet services) implement `GridStore` in
//! their own crates and own transport, authentication and retries.

mod error;
mod memory;
mod traits;
mod types;

pub use error::GridStoreError;
pub use memory::{MemoryGridStore, StoreStats, DEFAULT_SUB_GRID};
pub use traits::GridStore;
pub use types::{
    Dimension, DocumentInfo, DocumentLookup, DocumentSummary, StructuralReply, StructuralRequest,
    SubGridInfo,
};
