//! In-memory stores for pipeline tests.
//!
//! Both stores append to a shared [`CallLog`] so tests can assert the order
//! in which the two halves were touched. Faults are injected per operation
//! name and fire once the operation has succeeded `after` times.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roster_repository::{BackendError, GraphStore, NodeLabel, SearchStore};
use roster_shared::{
    Alias, IndexDocument, Organization, Person, SearchHit, SearchQuery, SearchResponse,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct Fault {
    after: usize,
    error: BackendError,
}

#[derive(Default)]
struct Faults {
    armed: Mutex<HashMap<&'static str, Fault>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl Faults {
    fn arm(&self, operation: &'static str, after: usize, error: BackendError) {
        self.armed
            .lock()
            .unwrap()
            .insert(operation, Fault { after, error });
    }

    fn disarm(&self, operation: &'static str) {
        self.armed.lock().unwrap().remove(operation);
    }

    fn check(&self, operation: &'static str) -> Result<(), BackendError> {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(operation).or_insert(0);
        *count += 1;
        match self.armed.lock().unwrap().get(operation) {
            Some(fault) if *count > fault.after => Err(fault.error.clone()),
            _ => Ok(()),
        }
    }
}

fn rejoin(person: &Person, organization: &Organization) -> Person {
    Person::new(
        Some(person.id().to_string()),
        Some(person.name().to_string()),
        Some(person.alias().to_string()),
        Some(person.email().to_string()),
        Some(person.nationality().to_string()),
        Some(organization.clone()),
    )
    .unwrap()
}

#[derive(Default)]
pub struct InMemoryGraph {
    organizations: Mutex<BTreeMap<String, Organization>>,
    people: Mutex<BTreeMap<String, Person>>,
    log: Arc<CallLog>,
    faults: Faults,
    cancel_on_write: Mutex<Option<CancellationToken>>,
}

impl InMemoryGraph {
    pub fn with_log(log: Arc<CallLog>) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    /// Fail `operation` once it has succeeded `after` times.
    pub fn fail(&self, operation: &'static str, after: usize, error: BackendError) {
        self.faults.arm(operation, after, error);
    }

    pub fn heal(&self, operation: &'static str) {
        self.faults.disarm(operation);
    }

    /// Cancel `token` after the next organization write.
    pub fn cancel_on_write(&self, token: CancellationToken) {
        *self.cancel_on_write.lock().unwrap() = Some(token);
    }

    pub fn organization_count(&self) -> usize {
        self.organizations.lock().unwrap().len()
    }

    pub fn person_count(&self) -> usize {
        self.people.lock().unwrap().len()
    }

    fn joined_people(&self) -> Vec<Person> {
        let organizations = self.organizations.lock().unwrap();
        let mut people: Vec<Person> = self
            .people
            .lock()
            .unwrap()
            .values()
            .filter_map(|p| {
                organizations
                    .get(p.membership().group_id())
                    .map(|org| rejoin(p, org))
            })
            .collect();
        people.sort_by(|a, b| a.name().cmp(b.name()));
        people
    }
}

fn window<T>(items: Vec<T>, skip: u64, limit: u64) -> Vec<T> {
    items
        .into_iter()
        .skip(skip as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl GraphStore for InMemoryGraph {
    async fn upsert_organization(&self, organization: &Organization) -> Result<(), BackendError> {
        self.faults.check("upsert_organization")?;
        self.log
            .push(format!("graph.upsert_organization:{}", organization.group_id()));
        self.organizations
            .lock()
            .unwrap()
            .insert(organization.group_id().to_string(), organization.clone());
        if let Some(token) = self.cancel_on_write.lock().unwrap().take() {
            token.cancel();
        }
        Ok(())
    }

    async fn upsert_person(&self, person: &Person) -> Result<(), BackendError> {
        self.faults.check("upsert_person")?;
        let group_id = person.membership().group_id();
        if !self.organizations.lock().unwrap().contains_key(group_id) {
            return Err(BackendError::rejected(format!(
                "Organization {group_id} does not exist"
            )));
        }
        self.log.push(format!("graph.upsert_person:{}", person.id()));
        self.people
            .lock()
            .unwrap()
            .insert(person.id().to_string(), person.clone());
        Ok(())
    }

    async fn delete_organization(&self, group_id: &str) -> Result<(), BackendError> {
        self.faults.check("delete_organization")?;
        self.log.push(format!("graph.delete_organization:{group_id}"));
        self.organizations.lock().unwrap().remove(group_id);
        Ok(())
    }

    async fn delete_person(&self, id: &str) -> Result<(), BackendError> {
        self.faults.check("delete_person")?;
        self.log.push(format!("graph.delete_person:{id}"));
        self.people.lock().unwrap().remove(id);
        Ok(())
    }

    async fn find_organization(&self, group_id: &str) -> Result<Option<Organization>, BackendError> {
        self.faults.check("find_organization")?;
        Ok(self.organizations.lock().unwrap().get(group_id).cloned())
    }

    async fn find_person(&self, id: &str) -> Result<Option<Person>, BackendError> {
        self.faults.check("find_person")?;
        Ok(self.joined_people().into_iter().find(|p| p.id() == id))
    }

    async fn count(&self, label: NodeLabel) -> Result<u64, BackendError> {
        self.faults.check("count")?;
        let count = match label {
            NodeLabel::Organization => self.organizations.lock().unwrap().len(),
            NodeLabel::Person => self.people.lock().unwrap().len(),
        };
        Ok(count as u64)
    }

    async fn list_organizations(&self, skip: u64, limit: u64) -> Result<Vec<Organization>, BackendError> {
        self.faults.check("list_organizations")?;
        let mut organizations: Vec<Organization> =
            self.organizations.lock().unwrap().values().cloned().collect();
        organizations.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(window(organizations, skip, limit))
    }

    async fn list_people(&self, skip: u64, limit: u64) -> Result<Vec<Person>, BackendError> {
        self.faults.check("list_people")?;
        Ok(window(self.joined_people(), skip, limit))
    }
}

#[derive(Default)]
pub struct InMemorySearch {
    documents: Mutex<BTreeMap<Alias, BTreeMap<String, IndexDocument>>>,
    bulk_sizes: Mutex<Vec<(Alias, usize)>>,
    log: Arc<CallLog>,
    faults: Faults,
}

impl InMemorySearch {
    pub fn with_log(log: Arc<CallLog>) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn fail(&self, operation: &'static str, after: usize, error: BackendError) {
        self.faults.arm(operation, after, error);
    }

    pub fn heal(&self, operation: &'static str) {
        self.faults.disarm(operation);
    }

    /// Sizes of every successful bulk request, in order.
    pub fn bulk_sizes(&self) -> Vec<(Alias, usize)> {
        self.bulk_sizes.lock().unwrap().clone()
    }

    pub fn document(&self, alias: Alias, id: &str) -> Option<IndexDocument> {
        self.documents
            .lock()
            .unwrap()
            .get(&alias)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub fn document_count(&self, alias: Alias) -> usize {
        self.documents
            .lock()
            .unwrap()
            .get(&alias)
            .map_or(0, BTreeMap::len)
    }

    fn store(&self, alias: Alias, document: &IndexDocument) {
        self.documents
            .lock()
            .unwrap()
            .entry(alias)
            .or_default()
            .insert(document.id.clone(), document.clone());
    }
}

#[async_trait]
impl SearchStore for InMemorySearch {
    async fn bulk_index(&self, alias: Alias, documents: &[IndexDocument]) -> Result<(), BackendError> {
        self.faults.check("bulk_index")?;
        self.log.push(format!("search.bulk_index:{alias}:{}", documents.len()));
        for document in documents {
            self.store(alias, document);
        }
        self.bulk_sizes.lock().unwrap().push((alias, documents.len()));
        Ok(())
    }

    async fn index(&self, alias: Alias, document: &IndexDocument) -> Result<(), BackendError> {
        self.faults.check("index")?;
        self.log.push(format!("search.index:{alias}:{}", document.id));
        self.store(alias, document);
        Ok(())
    }

    async fn delete(&self, alias: Alias, id: &str) -> Result<(), BackendError> {
        self.faults.check("delete")?;
        self.log.push(format!("search.delete:{alias}:{id}"));
        if let Some(docs) = self.documents.lock().unwrap().get_mut(&alias) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn refresh(&self, alias: Alias) -> Result<(), BackendError> {
        self.faults.check("refresh")?;
        self.log.push(format!("search.refresh:{alias}"));
        Ok(())
    }

    async fn search(&self, alias: Alias, query: &SearchQuery) -> Result<SearchResponse, BackendError> {
        self.faults.check("search")?;
        let needle = query.text.as_deref().map(str::to_lowercase);
        let documents = self.documents.lock().unwrap();
        let matches: Vec<&IndexDocument> = documents
            .get(&alias)
            .map(|docs| {
                docs.values()
                    .filter(|doc| match &needle {
                        Some(needle) => doc
                            .body
                            .values()
                            .any(|value| value.to_lowercase().contains(needle)),
                        None => true,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(SearchResponse {
            total: matches.len() as u64,
            hits: matches
                .into_iter()
                .skip(query.from)
                .take(query.size)
                .map(|doc| SearchHit {
                    id: doc.id.clone(),
                    score: Some(1.0),
                    source: doc.body.clone(),
                })
                .collect(),
        })
    }

    async fn ensure_alias(&self, alias: Alias) -> Result<(), BackendError> {
        self.faults.check("ensure_alias")?;
        self.documents.lock().unwrap().entry(alias).or_default();
        Ok(())
    }
}

/// A graph and search pair sharing one call log.
pub fn stores() -> (Arc<InMemoryGraph>, Arc<InMemorySearch>, Arc<CallLog>) {
    let log = Arc::new(CallLog::default());
    (
        Arc::new(InMemoryGraph::with_log(log.clone())),
        Arc::new(InMemorySearch::with_log(log.clone())),
        log,
    )
}

pub fn organization(group_id: &str, name: &str) -> Organization {
    Organization::new(Some(group_id.into()), Some(name.into())).unwrap()
}

pub fn person(id: &str, name: &str, organization: &Organization) -> Person {
    Person::new(
        Some(id.into()),
        Some(name.into()),
        Some(format!("{name} alias")),
        Some(format!("{id}@example.com")),
        Some(roster_shared::DEFAULT_NATIONALITY.into()),
        Some(organization.clone()),
    )
    .unwrap()
}
