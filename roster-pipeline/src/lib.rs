//! # Roster Pipeline
//!
//! Ingestion and synchronization between the graph store and the search
//! index.
//!
//! ## Architecture
//!
//! 1. **Consumer**: turns a CSV source into a stream of rows and maps header
//!    names to column positions
//! 2. **Processor**: builds validated `Organization` and `Person` records
//! 3. **Loader**: batches index documents per alias and flushes them
//! 4. **Orchestrator**: drives a row stream through graph writes and the loader
//! 5. **Sync**: single-record create, update and delete across both stores
//! 6. **Catalog**: the read and write operations an API layer delegates to

pub mod catalog;
pub mod consumer;
pub mod errors;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, OrganizationData, PersonData, Statistics};
pub use consumer::{csv_records, spawn_csv_reader, ColumnIndex, Record};
pub use errors::{BatchFlushError, CatalogError, IngestionError, SyncError};
pub use loader::{BatcherConfig, IndexBatcher};
pub use orchestrator::{IngestControl, IngestionPipeline, IngestionReport};
pub use processor::EntityFactory;
pub use sync::MutationSynchronizer;
