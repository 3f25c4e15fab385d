//! OpenSearch implementation of the search store.
//!
//! This module provides a concrete implementation of `SearchStore` using
//! OpenSearch as the backend, connected lazily through a `BackendClient`.

mod client;
mod index_config;
mod queries;

pub use client::{OpenSearchConnector, OpenSearchStore};
pub use index_config::index_settings;
pub use queries::build_search_query;
