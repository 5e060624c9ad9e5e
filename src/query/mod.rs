//! Read-side queries over the graph
//!
//! Subgraph extraction walks outward from a center element, keeping only
//! elements at the requested share levels.

mod ordered;
mod subgraph;

pub use ordered::OrderedMap;
pub use subgraph::{Subgraph, SubgraphQuery, VertexInSubgraph};
