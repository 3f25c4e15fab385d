//! Catalog operations.
//!
//! The read and write operations an HTTP layer delegates to. Reads go to the
//! graph store; writes go through the [`MutationSynchronizer`] so the search
//! index follows.

use std::sync::Arc;

use roster_repository::{BackendError, GraphStore, NodeLabel, SearchStore};
use roster_shared::{
    Alias, Organization, Page, PageRequest, Person, SearchQuery, SearchResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::errors::CatalogError;
use crate::processor::EntityFactory;
use crate::sync::MutationSynchronizer;

/// Service name reported by [`Catalog::statistics`].
pub const SERVICE_NAME: &str = "roster-indexer";

/// Request body for organization writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationData {
    pub group_id: String,
    pub name: String,
}

/// Request body for person writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonData {
    pub id: String,
    pub name: String,
    pub alias: String,
    pub email: String,
    #[serde(default)]
    pub nationality: Option<String>,
    pub organization_group_id: String,
}

/// Node counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub name: String,
    pub organizations: u64,
    pub persons: u64,
}

fn graph(e: BackendError) -> CatalogError {
    CatalogError::Graph(e)
}

pub struct Catalog {
    graph: Arc<dyn GraphStore>,
    search: Arc<dyn SearchStore>,
    sync: MutationSynchronizer,
    factory: EntityFactory,
}

impl Catalog {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        search: Arc<dyn SearchStore>,
        factory: EntityFactory,
    ) -> Self {
        let sync = MutationSynchronizer::new(graph.clone(), search.clone());
        Self {
            graph,
            search,
            sync,
            factory,
        }
    }

    pub async fn statistics(&self) -> Result<Statistics, CatalogError> {
        let organizations = self.graph.count(NodeLabel::Organization).await.map_err(graph)?;
        let persons = self.graph.count(NodeLabel::Person).await.map_err(graph)?;
        Ok(Statistics {
            name: SERVICE_NAME.to_string(),
            organizations,
            persons,
        })
    }

    /// Organizations ordered by name.
    pub async fn list_organizations(
        &self,
        request: PageRequest,
    ) -> Result<Page<Organization>, CatalogError> {
        let total = self.graph.count(NodeLabel::Organization).await.map_err(graph)?;
        let window = request.window(total)?;
        let items = self
            .graph
            .list_organizations(window.skip, window.limit)
            .await
            .map_err(graph)?;
        Ok(Page::new(request, window, total, items))
    }

    /// People ordered by name, each joined with its organization.
    pub async fn list_people(&self, request: PageRequest) -> Result<Page<Person>, CatalogError> {
        let total = self.graph.count(NodeLabel::Person).await.map_err(graph)?;
        let window = request.window(total)?;
        let items = self
            .graph
            .list_people(window.skip, window.limit)
            .await
            .map_err(graph)?;
        Ok(Page::new(request, window, total, items))
    }

    pub async fn get_organization(&self, group_id: &str) -> Result<Organization, CatalogError> {
        self.graph
            .find_organization(group_id)
            .await
            .map_err(graph)?
            .ok_or(CatalogError::NotFound("Organization"))
    }

    pub async fn get_person(&self, id: &str) -> Result<Person, CatalogError> {
        self.graph
            .find_person(id)
            .await
            .map_err(graph)?
            .ok_or(CatalogError::NotFound("Person"))
    }

    #[instrument(skip_all, fields(group_id = %data.group_id))]
    pub async fn create_organization(
        &self,
        data: &OrganizationData,
    ) -> Result<Organization, CatalogError> {
        let organization = self
            .factory
            .make_organization(Some(&data.group_id), Some(&data.name))?;
        self.sync.create_organization(&organization).await?;
        info!("Organization created");
        Ok(organization)
    }

    #[instrument(skip_all, fields(group_id = %group_id))]
    pub async fn update_organization(
        &self,
        group_id: &str,
        data: &OrganizationData,
    ) -> Result<Organization, CatalogError> {
        self.get_organization(group_id).await?;
        let organization = self
            .factory
            .make_organization(Some(&data.group_id), Some(&data.name))?;
        self.sync.update_organization(group_id, &organization).await?;
        info!("Organization updated");
        Ok(organization)
    }

    /// Delete an organization and return it. Members are kept.
    #[instrument(skip_all, fields(group_id = %group_id))]
    pub async fn delete_organization(&self, group_id: &str) -> Result<Organization, CatalogError> {
        let organization = self.get_organization(group_id).await?;
        self.sync.delete_organization(group_id).await?;
        info!("Organization deleted");
        Ok(organization)
    }

    #[instrument(skip_all, fields(id = %data.id))]
    pub async fn create_person(&self, data: &PersonData) -> Result<Person, CatalogError> {
        let organization = self.get_organization(&data.organization_group_id).await?;
        let person = self.person(data, organization)?;
        self.sync.create_person(&person).await?;
        info!("Person created");
        Ok(person)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn update_person(&self, id: &str, data: &PersonData) -> Result<Person, CatalogError> {
        let organization = self.get_organization(&data.organization_group_id).await?;
        self.get_person(id).await?;
        let person = self.person(data, organization)?;
        self.sync.update_person(id, &person).await?;
        info!("Person updated");
        Ok(person)
    }

    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete_person(&self, id: &str) -> Result<Person, CatalogError> {
        let person = self.get_person(id).await?;
        self.sync.delete_person(id).await?;
        info!("Person deleted");
        Ok(person)
    }

    pub async fn search(
        &self,
        alias: Alias,
        query: &SearchQuery,
    ) -> Result<SearchResponse, CatalogError> {
        self.search
            .search(alias, query)
            .await
            .map_err(CatalogError::Index)
    }

    fn person(&self, data: &PersonData, organization: Organization) -> Result<Person, CatalogError> {
        Ok(self.factory.make_person(
            Some(&data.id),
            Some(&data.name),
            Some(&data.alias),
            Some(&data.email),
            data.nationality.as_deref(),
            Some(&organization),
        )?)
    }
}
