//! # Roster Indexer
//!
//! Entry point and configuration for loading roster files into the graph
//! store and the search index.

pub mod commands;
pub mod config;
pub mod logging;

pub use config::{Dependencies, IndexerSettings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingestion error.
    #[error("Ingestion error: {0}")]
    IngestionError(#[from] roster_pipeline::IngestionError),

    /// Catalog error.
    #[error("Catalog error: {0}")]
    CatalogError(#[from] roster_pipeline::CatalogError),

    /// Backend error.
    #[error("Backend error: {0}")]
    BackendError(#[from] roster_repository::BackendError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
