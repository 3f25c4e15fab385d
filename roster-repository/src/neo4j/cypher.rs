//! Cypher statements and row mapping for the graph store.
//!
//! Rows are always returned as scalar columns so the mapping to typed records
//! happens here, in one place.

use neo4rs::Row;

use crate::errors::BackendError;
use crate::interfaces::NodeLabel;
use roster_shared::{Organization, Person};

pub(crate) const PING: &str = "RETURN 1";

pub(crate) const UPSERT_ORGANIZATION: &str = "\
MERGE (o:Organization {group_id: $group_id}) \
SET o.name = $name";

// Replaces whatever membership edge the person had with one pointing at
// $group_id. Yields no row when that organization does not exist.
pub(crate) const UPSERT_PERSON: &str = "\
MATCH (o:Organization {group_id: $group_id}) \
MERGE (p:Person {id: $id}) \
SET p.name = $name, p.alias = $alias, p.email = $email, p.nationality = $nationality \
WITH p, o \
OPTIONAL MATCH (p)-[m:MEMBERSHIP]->(:Organization) \
DELETE m \
WITH DISTINCT p, o \
MERGE (p)-[:MEMBERSHIP]->(o) \
RETURN p.id AS id";

pub(crate) const DELETE_ORGANIZATION: &str = "\
MATCH (o:Organization {group_id: $group_id}) \
DETACH DELETE o";

pub(crate) const DELETE_PERSON: &str = "\
MATCH (p:Person {id: $id}) \
DETACH DELETE p";

pub(crate) const FIND_ORGANIZATION: &str = "\
MATCH (o:Organization {group_id: $group_id}) \
RETURN o.group_id AS group_id, o.name AS name";

pub(crate) const FIND_PERSON: &str = "\
MATCH (p:Person)-[:MEMBERSHIP]->(o:Organization) \
WHERE p.id = $id \
RETURN p.id AS id, p.name AS name, p.alias AS alias, p.email AS email, \
p.nationality AS nationality, o.group_id AS group_id, o.name AS group_name";

pub(crate) const LIST_ORGANIZATIONS: &str = "\
MATCH (o:Organization) \
RETURN o.group_id AS group_id, o.name AS name \
ORDER BY o.name SKIP $skip LIMIT $limit";

pub(crate) const LIST_PEOPLE: &str = "\
MATCH (p:Person)-[:MEMBERSHIP]->(o:Organization) \
RETURN p.id AS id, p.name AS name, p.alias AS alias, p.email AS email, \
p.nationality AS nationality, o.group_id AS group_id, o.name AS group_name \
ORDER BY p.name SKIP $skip LIMIT $limit";

pub(crate) fn count_statement(label: NodeLabel) -> &'static str {
    match label {
        NodeLabel::Organization => "MATCH (n:Organization) RETURN count(n) AS total",
        NodeLabel::Person => "MATCH (n:Person) RETURN count(n) AS total",
    }
}

fn column<'a, T: serde::Deserialize<'a>>(row: &'a Row, name: &str) -> Result<T, BackendError> {
    row.get::<T>(name)
        .map_err(|e| BackendError::decode(format!("column {}: {}", name, e)))
}

pub(crate) fn organization_from_row(row: &Row) -> Result<Organization, BackendError> {
    organization_from_columns(row, "name")
}

fn organization_from_columns(row: &Row, name_column: &str) -> Result<Organization, BackendError> {
    Organization::new(
        Some(column::<String>(row, "group_id")?),
        Some(column::<String>(row, name_column)?),
    )
    .map_err(|e| BackendError::decode(e.to_string()))
}

pub(crate) fn person_from_row(row: &Row) -> Result<Person, BackendError> {
    let organization = organization_from_columns(row, "group_name")?;
    Person::new(
        Some(column::<String>(row, "id")?),
        Some(column::<String>(row, "name")?),
        Some(column::<String>(row, "alias")?),
        Some(column::<String>(row, "email")?),
        Some(column::<String>(row, "nationality")?),
        Some(organization),
    )
    .map_err(|e| BackendError::decode(e.to_string()))
}

pub(crate) fn count_from_row(row: &Row) -> Result<u64, BackendError> {
    let total = column::<i64>(row, "total")?;
    u64::try_from(total).map_err(|e| BackendError::decode(e.to_string()))
}
