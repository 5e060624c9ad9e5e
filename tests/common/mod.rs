//! Common test utilities for Trellis integration tests
//!
//! This module provides a small scenario builder, a recording index sink and
//! an invariant checker that recomputes every denormalized counter.

#![allow(dead_code, unused_imports)]

pub mod graph_builder;
pub mod invariants;

pub use graph_builder::{AbcGraph, RecordingSink};
pub use invariants::assert_invariants;
