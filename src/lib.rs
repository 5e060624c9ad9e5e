//! Trellis: consistency engine for a personal, shareable knowledge graph
//!
//! Users build a graph of vertices joined by directed relations, attach
//! reusable tags, and decide who sees each element: only themselves, their
//! friends, or everyone. The engine keeps the denormalized state of that
//! graph exact across every mutation.
//!
//! # Core Concepts
//!
//! - **Share levels**: `Private < Friends < Public`; a relation is never more
//!   visible than either endpoint
//! - **Neighbor counters**: every vertex knows how many distinct neighbors it
//!   has at each level
//! - **Patterns**: a published subgraph template that others fork
//! - **Centers**: elements a user recently focused on, listed per audience
//!
//! # Example
//!
//! ```
//! use trellis::{GraphEngine, ShareLevel};
//!
//! let engine = GraphEngine::in_memory();
//! let a = engine.create_vertex("roger").unwrap();
//! let relation = engine.add_vertex_and_relation(a.id()).unwrap();
//! engine.make_public(a.id()).unwrap();
//!
//! let subgraph = engine
//!     .extract_subgraph(a.id(), 1, &[ShareLevel::Public])
//!     .unwrap();
//! assert_eq!(subgraph.vertex_count(), 1);
//! assert!(!subgraph.contains_vertex(&relation.destination));
//! ```

pub mod center;
pub mod config;
mod engine;
mod graph;
pub mod index;
pub mod query;
pub mod storage;

pub use center::{CenterEntry, CenterQuery, FriendOracle, FriendRegistry};
pub use config::{ConfigError, EngineConfig};
pub use engine::{ForkCache, GraphEngine, GraphError, GraphResult, TagSpec};
pub use graph::{
    ElementData, ElementId, ElementKind, GraphElement, GroupRelation, InvalidIdentifier,
    NbNeighbors, ParseShareLevelError, Relation, ShareLevel, Tag, Vertex,
};
pub use index::{IndexEvent, NoopIndexSink, SearchIndexSink, TracingIndexSink};
pub use query::{Subgraph, SubgraphQuery, VertexInSubgraph};
pub use storage::{GraphStore, GraphTransaction, MemoryStore, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
