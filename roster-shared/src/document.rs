//! Search index document types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::{Organization, Person};

/// A named partition of the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alias {
    /// Organization documents.
    Membership,
    /// Person documents.
    People,
}

impl Alias {
    /// Every alias, in flush order.
    pub const ALL: [Alias; 2] = [Alias::Membership, Alias::People];

    pub fn as_str(&self) -> &'static str {
        match self {
            Alias::Membership => "membership",
            Alias::People => "people",
        }
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "membership" => Ok(Alias::Membership),
            "people" => Ok(Alias::People),
            other => Err(format!("unknown alias: {}", other)),
        }
    }
}

/// A document destined for the search index.
///
/// The `id` is the primary key of the record it was derived from, so writing
/// the same record twice replaces the document instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: String,
    pub body: BTreeMap<String, String>,
}

impl IndexDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: BTreeMap::new(),
        }
    }

    /// Add a body field.
    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }
}

impl From<&Organization> for IndexDocument {
    fn from(organization: &Organization) -> Self {
        IndexDocument::new(organization.group_id()).with_field("name", organization.name())
    }
}

impl From<&Person> for IndexDocument {
    fn from(person: &Person) -> Self {
        IndexDocument::new(person.id())
            .with_field("name", person.name())
            .with_field("alias", person.alias())
            .with_field("email", person.email())
            .with_field("nationality", person.nationality())
    }
}
