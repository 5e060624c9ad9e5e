//! Core graph data structures

mod element;
mod id;
mod share_level;

pub use element::{ElementData, GraphElement, GroupRelation, Relation, Tag, Vertex};
pub use id::{ElementId, ElementKind, InvalidIdentifier};
pub use share_level::{NbNeighbors, ParseShareLevelError, ShareLevel};
