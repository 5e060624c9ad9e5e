//! Storage backends for Trellis
//!
//! The engine talks to storage only through the `GraphStore` trait. Every
//! engine operation runs inside one `GraphTransaction`, so a failed operation
//! leaves no partial writes behind. `SqliteStore` is the persistent backend;
//! `MemoryStore` backs tests and ephemeral engines.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, GraphTransaction, OpenStore, StorageError, StorageResult};
