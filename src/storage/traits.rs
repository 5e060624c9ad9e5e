//! Storage trait definitions

use crate::graph::{ElementId, GraphElement};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One atomic unit of work against a store
///
/// Reads observe the transaction's own uncommitted writes. Dropping a
/// transaction without calling [`commit`](GraphTransaction::commit) discards
/// every write made through it.
pub trait GraphTransaction {
    /// Load an element by id
    fn get(&self, id: &ElementId) -> StorageResult<Option<GraphElement>>;

    /// Insert or replace an element
    fn put(&mut self, element: GraphElement) -> StorageResult<()>;

    /// Delete an element; returns whether it existed
    fn delete(&mut self, id: &ElementId) -> StorageResult<bool>;

    /// Every element whose id is in `owner`'s namespace
    fn elements_of_owner(&self, owner: &str) -> StorageResult<Vec<GraphElement>>;

    /// Every element that has a last-center date
    fn centered_elements(&self) -> StorageResult<Vec<GraphElement>>;

    /// Total number of stored elements
    fn count(&self) -> StorageResult<usize>;

    /// Make every write durable and visible to later transactions
    fn commit(self: Box<Self>) -> StorageResult<()>;

    /// Discard every write
    fn rollback(self: Box<Self>) -> StorageResult<()>;
}

/// Trait for graph storage backends
///
/// Implementations must be thread-safe (Send + Sync). Transactions are
/// single-writer: `begin` blocks while another transaction is open.
pub trait GraphStore: Send + Sync {
    /// Start a transaction
    fn begin(&self) -> StorageResult<Box<dyn GraphTransaction + '_>>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
