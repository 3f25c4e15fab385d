//! Single-record mutations across the graph store and the search index.
//!
//! Writes go to the graph first and the index second, so a document never
//! exists for a record the graph does not hold. Deletes run the other way
//! round. Nothing is rolled back: a failure is returned tagged with the
//! store that failed, and the caller decides whether to retry.

use std::sync::Arc;

use roster_repository::{GraphStore, SearchStore};
use roster_shared::{Alias, IndexDocument, Organization, Person};
use tracing::{debug, instrument};

use crate::errors::SyncError;

pub struct MutationSynchronizer {
    graph: Arc<dyn GraphStore>,
    search: Arc<dyn SearchStore>,
}

impl MutationSynchronizer {
    pub fn new(graph: Arc<dyn GraphStore>, search: Arc<dyn SearchStore>) -> Self {
        Self { graph, search }
    }

    #[instrument(skip_all, fields(group_id = organization.group_id()))]
    pub async fn create_organization(&self, organization: &Organization) -> Result<(), SyncError> {
        self.graph
            .upsert_organization(organization)
            .await
            .map_err(SyncError::Graph)?;
        self.put(Alias::Membership, IndexDocument::from(organization))
            .await
    }

    /// Replace the organization stored under `group_id`.
    #[instrument(skip_all, fields(group_id = %group_id))]
    pub async fn update_organization(
        &self,
        group_id: &str,
        organization: &Organization,
    ) -> Result<(), SyncError> {
        organization.ensure_key(group_id)?;
        self.create_organization(organization).await
    }

    /// Remove the organization. Its members stay in the graph.
    #[instrument(skip_all, fields(group_id = %group_id))]
    pub async fn delete_organization(&self, group_id: &str) -> Result<(), SyncError> {
        self.remove(Alias::Membership, group_id).await?;
        self.graph
            .delete_organization(group_id)
            .await
            .map_err(SyncError::Graph)
    }

    #[instrument(skip_all, fields(id = person.id()))]
    pub async fn create_person(&self, person: &Person) -> Result<(), SyncError> {
        self.graph
            .upsert_person(person)
            .await
            .map_err(SyncError::Graph)?;
        self.put(Alias::People, IndexDocument::from(person)).await
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_person(&self, id: &str, person: &Person) -> Result<(), SyncError> {
        person.ensure_key(id)?;
        self.create_person(person).await
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_person(&self, id: &str) -> Result<(), SyncError> {
        self.remove(Alias::People, id).await?;
        self.graph.delete_person(id).await.map_err(SyncError::Graph)
    }

    async fn put(&self, alias: Alias, document: IndexDocument) -> Result<(), SyncError> {
        self.search
            .index(alias, &document)
            .await
            .map_err(SyncError::Index)?;
        self.search.refresh(alias).await.map_err(SyncError::Index)?;
        debug!(alias = %alias, id = %document.id, "Document indexed");
        Ok(())
    }

    async fn remove(&self, alias: Alias, id: &str) -> Result<(), SyncError> {
        self.search
            .delete(alias, id)
            .await
            .map_err(SyncError::Index)?;
        self.search.refresh(alias).await.map_err(SyncError::Index)
    }
}
