//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchStore` using
//! the OpenSearch Rust client. The connection is opened on first use by a
//! [`BackendClient`] and every request goes through its retry loop.

use async_trait::async_trait;
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts, IndicesRefreshParts},
    BulkParts, DeleteParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::backend::{BackendClient, Connector};
use crate::config::{RetryPolicy, SearchSettings};
use crate::errors::BackendError;
use crate::interfaces::SearchStore;
use crate::opensearch::index_config::index_settings;
use crate::opensearch::queries::{
    build_bulk_body, build_search_query, bulk_failure, parse_search_response,
};
use roster_shared::{Alias, IndexDocument, SearchQuery, SearchResponse};

/// Opens OpenSearch connections from the URL held in a secret file.
pub struct OpenSearchConnector {
    settings: SearchSettings,
}

impl OpenSearchConnector {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for OpenSearchConnector {
    type Handle = OpenSearch;

    fn backend(&self) -> &'static str {
        "opensearch"
    }

    async fn connect(&self) -> Result<OpenSearch, BackendError> {
        let url = self.settings.resolve()?;
        let parsed_url = Url::parse(&url)
            .map_err(|e| BackendError::configuration(format!("Invalid OpenSearch URL: {}", e)))?;
        let host = parsed_url.host_str().unwrap_or_default().to_string();

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| BackendError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        let response = client
            .ping()
            .send()
            .await
            .map_err(|e| BackendError::connection(e.to_string()))?;
        let status = response.status_code();
        if !status.is_success() {
            return Err(BackendError::connection(format!(
                "Ping failed with status {}",
                status
            )));
        }

        info!(host = %host, "Connected to OpenSearch");
        Ok(client)
    }
}

/// OpenSearch-backed [`SearchStore`].
///
/// # Example
///
/// ```ignore
/// let store = OpenSearchStore::new(SearchSettings::from_env(), RetryPolicy::default());
/// store.ensure_alias(Alias::People).await?;
/// let response = store.search(Alias::People, &SearchQuery::text("smith")).await?;
/// println!("Hits: {}", response.total);
/// ```
pub struct OpenSearchStore {
    client: BackendClient<OpenSearchConnector>,
}

impl OpenSearchStore {
    pub fn new(settings: SearchSettings, policy: RetryPolicy) -> Self {
        Self {
            client: BackendClient::new(OpenSearchConnector::new(settings), policy),
        }
    }

    /// The underlying connection manager.
    pub fn client(&self) -> &BackendClient<OpenSearchConnector> {
        &self.client
    }
}

fn transport_error(e: opensearch::Error) -> BackendError {
    BackendError::request(e.to_string())
}

/// Pass successful responses through; classify the rest.
async fn check_status(response: Response, action: &str) -> Result<Response, BackendError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    error!(status = %status, body = %error_body, action = action, "OpenSearch request failed");
    let message = format!("{} failed with status {}: {}", action, status, error_body);

    if status.is_server_error() || status.as_u16() == 429 {
        Err(BackendError::request(message))
    } else {
        Err(BackendError::rejected(message))
    }
}

#[async_trait]
impl SearchStore for OpenSearchStore {
    #[instrument(skip_all, fields(alias = %alias, count = documents.len()))]
    async fn bulk_index(&self, alias: Alias, documents: &[IndexDocument]) -> Result<(), BackendError> {
        if documents.is_empty() {
            return Ok(());
        }

        let body = build_bulk_body(alias, documents);

        self.client
            .call(|client| {
                let body: Vec<JsonBody<Value>> = body.iter().cloned().map(JsonBody::from).collect();
                async move {
                    let response = client
                        .bulk(BulkParts::Index(alias.as_str()))
                        .body(body)
                        .send()
                        .await
                        .map_err(transport_error)?;
                    let response = check_status(response, "Bulk index").await?;
                    let response_body: Value = response
                        .json()
                        .await
                        .map_err(|e| BackendError::decode(e.to_string()))?;

                    match bulk_failure(&response_body) {
                        Some(e) => Err(e),
                        None => Ok(()),
                    }
                }
            })
            .await?;

        debug!(alias = %alias, count = documents.len(), "Bulk indexed documents");
        Ok(())
    }

    async fn index(&self, alias: Alias, document: &IndexDocument) -> Result<(), BackendError> {
        self.client
            .call(|client| {
                let id = document.id.clone();
                let body = json!(document.body);
                async move {
                    let response = client
                        .index(IndexParts::IndexId(alias.as_str(), &id))
                        .body(body)
                        .send()
                        .await
                        .map_err(transport_error)?;
                    check_status(response, "Index").await?;
                    Ok(())
                }
            })
            .await?;

        debug!(alias = %alias, doc_id = %document.id, "Document indexed");
        Ok(())
    }

    async fn delete(&self, alias: Alias, id: &str) -> Result<(), BackendError> {
        self.client
            .call(|client| {
                let id = id.to_string();
                async move {
                    let response = client
                        .delete(DeleteParts::IndexId(alias.as_str(), &id))
                        .send()
                        .await
                        .map_err(transport_error)?;

                    // 404 is acceptable - document may not exist
                    if response.status_code().as_u16() == 404 {
                        return Ok(());
                    }
                    check_status(response, "Delete").await?;
                    Ok(())
                }
            })
            .await?;

        debug!(alias = %alias, doc_id = %id, "Document deleted");
        Ok(())
    }

    async fn refresh(&self, alias: Alias) -> Result<(), BackendError> {
        self.client
            .call(|client| async move {
                let response = client
                    .indices()
                    .refresh(IndicesRefreshParts::Index(&[alias.as_str()]))
                    .send()
                    .await
                    .map_err(transport_error)?;
                check_status(response, "Refresh").await?;
                Ok(())
            })
            .await
    }

    #[instrument(skip_all, fields(alias = %alias))]
    async fn search(&self, alias: Alias, query: &SearchQuery) -> Result<SearchResponse, BackendError> {
        let body = build_search_query(query);

        self.client
            .call(|client| {
                let body = body.clone();
                async move {
                    let response = client
                        .search(SearchParts::Index(&[alias.as_str()]))
                        .body(body)
                        .send()
                        .await
                        .map_err(transport_error)?;
                    let response = check_status(response, "Search").await?;
                    let response_body: Value = response
                        .json()
                        .await
                        .map_err(|e| BackendError::decode(e.to_string()))?;
                    parse_search_response(&response_body)
                }
            })
            .await
    }

    async fn ensure_alias(&self, alias: Alias) -> Result<(), BackendError> {
        self.client
            .call(|client| async move {
                let exists = client
                    .indices()
                    .exists(IndicesExistsParts::Index(&[alias.as_str()]))
                    .send()
                    .await
                    .map_err(transport_error)?;
                if exists.status_code().is_success() {
                    return Ok(());
                }

                let response = client
                    .indices()
                    .create(IndicesCreateParts::Index(alias.as_str()))
                    .body(index_settings(alias))
                    .send()
                    .await
                    .map_err(transport_error)?;
                check_status(response, "Index creation").await?;

                info!(alias = %alias, "Created search index");
                Ok(())
            })
            .await
    }
}
