//! # Roster Repository
//!
//! Backend boundary for the roster indexer. It provides the lazily-connecting
//! [`BackendClient`] state machine, the [`GraphStore`] and [`SearchStore`]
//! interfaces consumed by the pipeline, and concrete implementations backed by
//! Neo4j and OpenSearch.

pub mod backend;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod neo4j;
pub mod opensearch;

pub use backend::{BackendClient, ConnectionStatus, Connector};
pub use config::{GraphSettings, RetryPolicy, SearchSettings, SecretFile};
pub use errors::BackendError;
pub use interfaces::{GraphStore, NodeLabel, SearchStore};
pub use neo4j::{Neo4jConnector, Neo4jGraphStore};
pub use opensearch::{OpenSearchConnector, OpenSearchStore};
