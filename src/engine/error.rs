//! Engine error type

use crate::graph::{ElementId, ElementKind, InvalidIdentifier};
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur in engine operations
///
/// Failed preconditions (merging a pattern, relating to a pattern, ...) are
/// not errors; those operations report them through their return value.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Invalid depth of sub vertices. Depth was:{depth} and center vertex uri was:{center}")]
    InvalidDepth { center: ElementId, depth: i32 },

    #[error("Element not found: {0}")]
    NotFound(ElementId),

    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    #[error("Element {id} is not a {expected}")]
    WrongKind { id: ElementId, expected: ElementKind },

    #[error("Transaction aborted: {0}")]
    TransactionAborted(#[from] StorageError),
}

/// Result type for engine operations
pub type GraphResult<T> = Result<T, GraphError>;
