//! Organization and Person records.
//!
//! Both records can only be built through their validating constructors, so a
//! value of either type always carries a non-empty primary key and non-empty
//! properties. A `Person` always owns exactly one membership `Organization`.

use serde::Serialize;
use thiserror::Error;

/// Nationality assigned to people imported from a roster file.
pub const DEFAULT_NATIONALITY: &str = "GB (Great Britain)";

/// Errors raised when a record cannot be constructed or changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("{entity}.{field} is required")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// A person was constructed without an organization.
    #[error("Person requires a membership organization")]
    MissingOrganization,

    /// An update tried to overwrite an immutable primary key.
    #[error("{entity} primary key is immutable: expected {expected}, got {found}")]
    KeyChanged {
        entity: &'static str,
        expected: String,
        found: String,
    },
}

impl ValidationError {
    /// Create a missing field error.
    pub fn missing(entity: &'static str, field: &'static str) -> Self {
        Self::MissingField { entity, field }
    }
}

fn required(
    entity: &'static str,
    field: &'static str,
    value: Option<String>,
) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::missing(entity, field)),
    }
}

/// A group people belong to. Keyed by `group_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    group_id: String,
    name: String,
}

impl Organization {
    /// Graph label for organization nodes.
    pub const LABEL: &'static str = "Organization";

    /// Build an organization, rejecting absent or blank fields.
    pub fn new(
        group_id: Option<String>,
        name: Option<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            group_id: required("Organization", "group_id", group_id)?,
            name: required("Organization", "name", name)?,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fail unless this record still carries `group_id`.
    pub fn ensure_key(&self, group_id: &str) -> Result<(), ValidationError> {
        if self.group_id != group_id {
            return Err(ValidationError::KeyChanged {
                entity: "Organization",
                expected: group_id.to_string(),
                found: self.group_id.clone(),
            });
        }
        Ok(())
    }
}

/// A member of exactly one organization. Keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    id: String,
    name: String,
    alias: String,
    email: String,
    nationality: String,
    membership: Organization,
}

impl Person {
    /// Graph label for person nodes.
    pub const LABEL: &'static str = "Person";
    /// Relationship type linking a person to its organization.
    pub const MEMBERSHIP: &'static str = "MEMBERSHIP";

    /// Build a person, rejecting absent or blank fields and a missing
    /// organization.
    pub fn new(
        id: Option<String>,
        name: Option<String>,
        alias: Option<String>,
        email: Option<String>,
        nationality: Option<String>,
        organization: Option<Organization>,
    ) -> Result<Self, ValidationError> {
        let id = required("Person", "id", id)?;
        let name = required("Person", "name", name)?;
        let alias = required("Person", "alias", alias)?;
        let email = required("Person", "email", email)?;
        let nationality = required("Person", "nationality", nationality)?;
        let membership = organization.ok_or(ValidationError::MissingOrganization)?;

        Ok(Self {
            id,
            name,
            alias,
            email,
            nationality,
            membership,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn nationality(&self) -> &str {
        &self.nationality
    }

    /// The organization this person belongs to.
    pub fn membership(&self) -> &Organization {
        &self.membership
    }

    /// Fail unless this record still carries `id`.
    pub fn ensure_key(&self, id: &str) -> Result<(), ValidationError> {
        if self.id != id {
            return Err(ValidationError::KeyChanged {
                entity: "Person",
                expected: id.to_string(),
                found: self.id.clone(),
            });
        }
        Ok(())
    }
}
