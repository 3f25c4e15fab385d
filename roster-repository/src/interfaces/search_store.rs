//! Search store trait definition.

use async_trait::async_trait;

use crate::errors::BackendError;
use roster_shared::{Alias, IndexDocument, SearchQuery, SearchResponse};

/// Abstract interface for the search index.
///
/// Documents are addressed by `(alias, id)`. Indexing a document whose id
/// already exists under the alias replaces it.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Index many documents under `alias` in one request.
    ///
    /// Fails if any document was not accepted.
    async fn bulk_index(&self, alias: Alias, documents: &[IndexDocument]) -> Result<(), BackendError>;

    /// Index a single document under `alias`.
    async fn index(&self, alias: Alias, document: &IndexDocument) -> Result<(), BackendError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, alias: Alias, id: &str) -> Result<(), BackendError>;

    /// Make recent writes under `alias` visible to searches.
    async fn refresh(&self, alias: Alias) -> Result<(), BackendError>;

    /// Search one alias.
    async fn search(&self, alias: Alias, query: &SearchQuery) -> Result<SearchResponse, BackendError>;

    /// Create the index behind `alias` with its mappings if it does not exist.
    async fn ensure_alias(&self, alias: Alias) -> Result<(), BackendError>;
}
