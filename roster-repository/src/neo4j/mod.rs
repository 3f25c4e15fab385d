//! Neo4j implementation of the graph store.

mod client;
mod cypher;

pub use client::{Neo4jConnector, Neo4jGraphStore};
