//! Interface definitions for the graph store and the search index.
//!
//! The pipeline depends only on these traits, so either backend can be
//! replaced by an in-memory or fault-injecting implementation in tests.

mod graph_store;
mod search_store;

pub use graph_store::{GraphStore, NodeLabel};
pub use search_store::SearchStore;
