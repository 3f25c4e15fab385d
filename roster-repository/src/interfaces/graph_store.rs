//! Graph store trait definition.

use std::fmt;

use async_trait::async_trait;

use crate::errors::BackendError;
use roster_shared::{Organization, Person};

/// Node labels held by the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLabel {
    Organization,
    Person,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Organization => Organization::LABEL,
            NodeLabel::Person => Person::LABEL,
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed access to the graph of organizations and their members.
///
/// Writes are upserts keyed by primary key: writing a record whose key
/// already exists overwrites its properties instead of adding a node.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; ingestion pipelines may share one
/// store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create or overwrite an organization node.
    async fn upsert_organization(&self, organization: &Organization) -> Result<(), BackendError>;

    /// Create or overwrite a person node and point its single membership edge
    /// at `person.membership()`.
    ///
    /// The organization node must already exist; otherwise the write is
    /// rejected.
    async fn upsert_person(&self, person: &Person) -> Result<(), BackendError>;

    /// Delete an organization node. Member person nodes are left in place.
    async fn delete_organization(&self, group_id: &str) -> Result<(), BackendError>;

    /// Delete a person node and its membership edge.
    async fn delete_person(&self, id: &str) -> Result<(), BackendError>;

    /// Look up an organization by `group_id`.
    async fn find_organization(&self, group_id: &str) -> Result<Option<Organization>, BackendError>;

    /// Look up a person, joined with its organization, by exact `id`.
    async fn find_person(&self, id: &str) -> Result<Option<Person>, BackendError>;

    /// Count nodes carrying `label`.
    async fn count(&self, label: NodeLabel) -> Result<u64, BackendError>;

    /// Organizations ordered by name.
    async fn list_organizations(&self, skip: u64, limit: u64) -> Result<Vec<Organization>, BackendError>;

    /// People joined with their organization, ordered by name.
    async fn list_people(&self, skip: u64, limit: u64) -> Result<Vec<Person>, BackendError>;
}
