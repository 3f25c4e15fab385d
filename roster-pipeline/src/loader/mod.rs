//! Loader module for the roster pipeline.
//!
//! Accumulates index documents per alias and writes them in bulk.

use std::collections::BTreeMap;
use std::sync::Arc;

use roster_repository::SearchStore;
use roster_shared::{Alias, IndexDocument};
use tracing::{debug, error, info, instrument};

use crate::errors::BatchFlushError;

/// Configuration for the index batcher.
#[derive(Debug, Clone, Copy)]
pub struct BatcherConfig {
    /// Number of pending documents for one alias that triggers a flush.
    pub batch_size: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

/// Batches index documents per alias.
///
/// A flush issues one bulk request followed by a refresh. When either fails
/// the documents stay pending and the next flush retries them. Aliases are
/// flushed independently.
pub struct IndexBatcher {
    client: Arc<dyn SearchStore>,
    config: BatcherConfig,
    pending: BTreeMap<Alias, Vec<IndexDocument>>,
}

impl IndexBatcher {
    /// Create a new batcher with the default batch size.
    pub fn new(client: Arc<dyn SearchStore>) -> Self {
        Self::with_config(client, BatcherConfig::default())
    }

    /// Create a new batcher with custom configuration.
    pub fn with_config(client: Arc<dyn SearchStore>, config: BatcherConfig) -> Self {
        let config = BatcherConfig {
            batch_size: config.batch_size.max(1),
        };
        Self {
            client,
            config,
            pending: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> BatcherConfig {
        self.config
    }

    /// Number of documents waiting for `alias`.
    pub fn pending(&self, alias: Alias) -> usize {
        self.pending.get(&alias).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.values().all(Vec::is_empty)
    }

    /// Queue a document, flushing `alias` once its batch is full.
    ///
    /// Returns the number of documents flushed by this call.
    pub async fn add(
        &mut self,
        alias: Alias,
        document: IndexDocument,
    ) -> Result<usize, BatchFlushError> {
        if self.enqueue(alias, document) {
            return self.flush(alias).await;
        }
        Ok(0)
    }

    /// Queue a document without flushing. Returns whether the batch for
    /// `alias` is now full.
    pub fn enqueue(&mut self, alias: Alias, document: IndexDocument) -> bool {
        let pending = self.pending.entry(alias).or_default();
        pending.push(document);
        pending.len() >= self.config.batch_size
    }

    /// Write every pending document for `alias` and refresh it.
    #[instrument(skip_all, fields(alias = %alias))]
    pub async fn flush(&mut self, alias: Alias) -> Result<usize, BatchFlushError> {
        let documents = match self.pending.get(&alias) {
            Some(documents) if !documents.is_empty() => documents,
            _ => return Ok(0),
        };
        let count = documents.len();

        info!(count, "Flushing documents to search index");

        let result = match self.client.bulk_index(alias, documents).await {
            Ok(()) => self.client.refresh(alias).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(error = %e, count, "Failed to flush documents");
            return Err(BatchFlushError::new(alias, count, e));
        }

        if let Some(documents) = self.pending.get_mut(&alias) {
            documents.clear();
        }
        debug!(count, "Successfully indexed documents");
        Ok(count)
    }

    /// Flush every alias. All aliases are attempted even if one fails; the
    /// first failure is returned.
    pub async fn drain(&mut self) -> Result<usize, BatchFlushError> {
        let mut flushed = 0;
        let mut first_error = None;

        for alias in Alias::ALL {
            match self.flush(alias).await {
                Ok(count) => flushed += count,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }
}
