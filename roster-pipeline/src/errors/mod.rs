//! Error types for the roster pipeline.

use roster_repository::BackendError;
use roster_shared::{Alias, PageError, ValidationError};
use thiserror::Error;

/// A flush of pending index documents failed. The documents stay pending.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to flush {pending} documents to {alias}: {source}")]
pub struct BatchFlushError {
    pub alias: Alias,
    pub pending: usize,
    #[source]
    pub source: BackendError,
}

impl BatchFlushError {
    pub fn new(alias: Alias, pending: usize, source: BackendError) -> Self {
        Self {
            alias,
            pending,
            source,
        }
    }
}

/// Errors that can occur while ingesting a record stream.
#[derive(Error, Debug)]
pub enum IngestionError {
    /// The stream cannot be ingested at all, e.g. required columns are missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A record could not be read from the source.
    #[error("Record {row} could not be read: {message}")]
    Source { row: usize, message: String },

    /// A graph write failed.
    #[error("Graph write failed: {0}")]
    Graph(#[from] BackendError),

    /// An index flush failed.
    #[error("Index flush failed: {0}")]
    Flush(#[from] BatchFlushError),

    /// Ingestion stopped early. `committed` rows reached the graph store.
    #[error("Ingestion stopped after {committed} of {total} rows: {cause}")]
    PartialIngestion {
        committed: usize,
        total: usize,
        last_committed_row: Option<usize>,
        #[source]
        cause: Box<IngestionError>,
    },
}

impl IngestionError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a source error for a one-based row number.
    pub fn source(row: usize, msg: impl ToString) -> Self {
        Self::Source {
            row,
            message: msg.to_string(),
        }
    }
}

/// A single-record mutation failed, tagged with the store that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The record was rejected before any store was touched.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The graph store half failed.
    #[error("Graph store error: {0}")]
    Graph(#[source] BackendError),

    /// The search index half failed.
    #[error("Search index error: {0}")]
    Index(#[source] BackendError),
}

/// Errors returned by catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Graph store error: {0}")]
    Graph(BackendError),

    #[error("Search index error: {0}")]
    Index(BackendError),
}

impl CatalogError {
    /// The HTTP status an API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            CatalogError::NotFound(_) => 404,
            CatalogError::BadRequest(_) | CatalogError::Validation(_) => 400,
            CatalogError::Graph(e) | CatalogError::Index(e) => {
                if e.is_unavailable() {
                    503
                } else {
                    502
                }
            }
        }
    }
}

impl From<SyncError> for CatalogError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Validation(e) => CatalogError::Validation(e),
            SyncError::Graph(e) => CatalogError::Graph(e),
            SyncError::Index(e) => CatalogError::Index(e),
        }
    }
}

impl From<PageError> for CatalogError {
    fn from(err: PageError) -> Self {
        CatalogError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_status_mapping() {
        assert_eq!(CatalogError::NotFound("Person").http_status(), 404);
        assert_eq!(CatalogError::from(PageError::PerPage).http_status(), 400);
        assert_eq!(
            CatalogError::from(SyncError::Validation(ValidationError::MissingOrganization))
                .http_status(),
            400
        );
        let unavailable = BackendError::Unavailable {
            backend: "neo4j",
            attempts: 5,
            last_error: "refused".into(),
        };
        assert_eq!(CatalogError::Graph(unavailable).http_status(), 503);
        assert_eq!(
            CatalogError::from(SyncError::Index(BackendError::rejected("400"))).http_status(),
            502
        );
    }

    #[test]
    fn test_partial_ingestion_message() {
        let err = IngestionError::PartialIngestion {
            committed: 2,
            total: 5,
            last_committed_row: Some(2),
            cause: Box::new(IngestionError::Graph(BackendError::request("reset"))),
        };
        assert_eq!(
            err.to_string(),
            "Ingestion stopped after 2 of 5 rows: Graph write failed: Request error: reset"
        );
    }
}
