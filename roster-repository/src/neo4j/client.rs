//! Neo4j client implementation.
//!
//! Provides the concrete implementation of `GraphStore` on top of `neo4rs`.
//! The bolt connection is opened on first use by a [`BackendClient`].

use async_trait::async_trait;
use neo4rs::{query, Graph, Neo4jErrorKind, Query, Row};
use tracing::{debug, info, instrument};

use crate::backend::{BackendClient, Connector};
use crate::config::{GraphSettings, RetryPolicy};
use crate::errors::BackendError;
use crate::interfaces::{GraphStore, NodeLabel};
use crate::neo4j::cypher;
use roster_shared::{Organization, Person};

/// Opens Neo4j connections from the URI and credentials held in secret files.
pub struct Neo4jConnector {
    settings: GraphSettings,
}

impl Neo4jConnector {
    pub fn new(settings: GraphSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for Neo4jConnector {
    type Handle = Graph;

    fn backend(&self) -> &'static str {
        "neo4j"
    }

    async fn connect(&self) -> Result<Graph, BackendError> {
        let credentials = self.settings.resolve()?;

        let graph = Graph::new(&credentials.uri, &credentials.user, &credentials.password)
            .await
            .map_err(handshake_error)?;

        graph.run(query(cypher::PING)).await.map_err(handshake_error)?;

        info!(user = %credentials.user, "Connected to Neo4j");
        Ok(graph)
    }
}

/// Neo4j-backed [`GraphStore`].
pub struct Neo4jGraphStore {
    client: BackendClient<Neo4jConnector>,
}

/// Classify a driver failure.
///
/// Bad connection inputs are configuration errors and client-side statement
/// failures are rejections; neither is retried. Everything else, IO and
/// transient or database errors included, may succeed on a fresh connection.
fn driver_error(e: neo4rs::Error) -> BackendError {
    match &e {
        neo4rs::Error::AuthenticationError(_)
        | neo4rs::Error::UrlParseError(_)
        | neo4rs::Error::UnsupportedScheme(_) => BackendError::configuration(e.to_string()),
        neo4rs::Error::Neo4j(inner) if matches!(inner.kind(), Neo4jErrorKind::Client(_)) => {
            BackendError::rejected(e.to_string())
        }
        _ => BackendError::request(e.to_string()),
    }
}

/// Like [`driver_error`], but retryable failures count as handshake errors.
fn handshake_error(e: neo4rs::Error) -> BackendError {
    match driver_error(e) {
        BackendError::Request(msg) => BackendError::connection(msg),
        other => other,
    }
}

impl Neo4jGraphStore {
    pub fn new(settings: GraphSettings, policy: RetryPolicy) -> Self {
        Self {
            client: BackendClient::new(Neo4jConnector::new(settings), policy),
        }
    }

    /// The underlying connection manager.
    pub fn client(&self) -> &BackendClient<Neo4jConnector> {
        &self.client
    }

    async fn run(&self, statement: Query) -> Result<(), BackendError> {
        self.client
            .call(|graph| {
                let statement = statement.clone();
                async move { graph.run(statement).await.map_err(driver_error) }
            })
            .await
    }

    async fn fetch(&self, statement: Query) -> Result<Vec<Row>, BackendError> {
        self.client
            .call(|graph| {
                let statement = statement.clone();
                async move {
                    let mut stream = graph.execute(statement).await.map_err(driver_error)?;
                    let mut rows = Vec::new();
                    while let Some(row) = stream.next().await.map_err(driver_error)? {
                        rows.push(row);
                    }
                    Ok(rows)
                }
            })
            .await
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    #[instrument(skip_all, fields(group_id = %organization.group_id()))]
    async fn upsert_organization(&self, organization: &Organization) -> Result<(), BackendError> {
        self.run(
            query(cypher::UPSERT_ORGANIZATION)
                .param("group_id", organization.group_id())
                .param("name", organization.name()),
        )
        .await?;
        debug!("Organization upserted");
        Ok(())
    }

    #[instrument(skip_all, fields(id = %person.id()))]
    async fn upsert_person(&self, person: &Person) -> Result<(), BackendError> {
        let rows = self
            .fetch(
                query(cypher::UPSERT_PERSON)
                    .param("group_id", person.membership().group_id())
                    .param("id", person.id())
                    .param("name", person.name())
                    .param("alias", person.alias())
                    .param("email", person.email())
                    .param("nationality", person.nationality()),
            )
            .await?;

        if rows.is_empty() {
            return Err(BackendError::rejected(format!(
                "Organization {} does not exist",
                person.membership().group_id()
            )));
        }
        debug!("Person upserted");
        Ok(())
    }

    async fn delete_organization(&self, group_id: &str) -> Result<(), BackendError> {
        self.run(query(cypher::DELETE_ORGANIZATION).param("group_id", group_id))
            .await
    }

    async fn delete_person(&self, id: &str) -> Result<(), BackendError> {
        self.run(query(cypher::DELETE_PERSON).param("id", id)).await
    }

    async fn find_organization(&self, group_id: &str) -> Result<Option<Organization>, BackendError> {
        let rows = self
            .fetch(query(cypher::FIND_ORGANIZATION).param("group_id", group_id))
            .await?;
        rows.first().map(cypher::organization_from_row).transpose()
    }

    async fn find_person(&self, id: &str) -> Result<Option<Person>, BackendError> {
        let rows = self.fetch(query(cypher::FIND_PERSON).param("id", id)).await?;
        rows.first().map(cypher::person_from_row).transpose()
    }

    async fn count(&self, label: NodeLabel) -> Result<u64, BackendError> {
        let rows = self.fetch(query(cypher::count_statement(label))).await?;
        match rows.first() {
            Some(row) => cypher::count_from_row(row),
            None => Ok(0),
        }
    }

    async fn list_organizations(&self, skip: u64, limit: u64) -> Result<Vec<Organization>, BackendError> {
        let rows = self
            .fetch(
                query(cypher::LIST_ORGANIZATIONS)
                    .param("skip", to_i64(skip))
                    .param("limit", to_i64(limit)),
            )
            .await?;
        rows.iter().map(cypher::organization_from_row).collect()
    }

    async fn list_people(&self, skip: u64, limit: u64) -> Result<Vec<Person>, BackendError> {
        let rows = self
            .fetch(
                query(cypher::LIST_PEOPLE)
                    .param("skip", to_i64(skip))
                    .param("limit", to_i64(limit)),
            )
            .await?;
        rows.iter().map(cypher::person_from_row).collect()
    }
}
