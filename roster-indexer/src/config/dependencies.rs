//! Dependency initialization and wiring for the roster indexer.

use std::sync::Arc;

use roster_pipeline::{Catalog, EntityFactory, IndexBatcher, IngestionPipeline};
use roster_repository::{GraphStore, Neo4jGraphStore, OpenSearchStore, SearchStore};
use roster_shared::Alias;
use tracing::info;

use crate::config::IndexerSettings;
use crate::IndexingError;

/// Container for all initialized dependencies.
///
/// Backend connections are opened lazily on first use, so building this
/// never touches the network.
pub struct Dependencies {
    pub graph: Arc<dyn GraphStore>,
    pub search: Arc<dyn SearchStore>,
    pub catalog: Catalog,
    settings: IndexerSettings,
}

impl Dependencies {
    pub fn new(settings: IndexerSettings) -> Self {
        info!(
            retry_attempts = settings.retry.max_attempts,
            retry_backoff_secs = settings.retry.backoff.as_secs(),
            batch_size = settings.batcher.batch_size,
            "Initializing dependencies"
        );

        let graph: Arc<dyn GraphStore> =
            Arc::new(Neo4jGraphStore::new(settings.graph.clone(), settings.retry));
        let search: Arc<dyn SearchStore> =
            Arc::new(OpenSearchStore::new(settings.search.clone(), settings.retry));

        Self::with_stores(settings, graph, search)
    }

    /// Wire the pipeline around already-built stores.
    pub fn with_stores(
        settings: IndexerSettings,
        graph: Arc<dyn GraphStore>,
        search: Arc<dyn SearchStore>,
    ) -> Self {
        let catalog = Catalog::new(graph.clone(), search.clone(), EntityFactory::new());
        Self {
            graph,
            search,
            catalog,
            settings,
        }
    }

    /// A fresh ingestion pipeline with an empty batcher.
    pub fn pipeline(&self) -> IngestionPipeline {
        IngestionPipeline::new(
            self.graph.clone(),
            EntityFactory::new(),
            IndexBatcher::with_config(self.search.clone(), self.settings.batcher),
        )
    }

    /// Create both aliases with their mappings if they are missing.
    pub async fn ensure_aliases(&self) -> Result<(), IndexingError> {
        for alias in Alias::ALL {
            self.search.ensure_alias(alias).await?;
        }
        info!("Search aliases verified");
        Ok(())
    }
}
