//! Builds validated domain records from raw fields.

use std::collections::HashMap;

use roster_shared::{Organization, Person, ValidationError, DEFAULT_NATIONALITY};

use crate::consumer::{self, ColumnIndex};

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Constructs `Organization` and `Person` records.
///
/// Validation lives in the record constructors; the factory only knows where
/// fields come from and which defaults apply.
#[derive(Debug, Clone)]
pub struct EntityFactory {
    default_nationality: String,
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityFactory {
    pub fn new() -> Self {
        Self::with_nationality(DEFAULT_NATIONALITY)
    }

    /// Use `nationality` for rows that do not carry one.
    pub fn with_nationality(nationality: impl Into<String>) -> Self {
        Self {
            default_nationality: nationality.into(),
        }
    }

    pub fn default_nationality(&self) -> &str {
        &self.default_nationality
    }

    pub fn make_organization(
        &self,
        group_id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Organization, ValidationError> {
        Organization::new(owned(group_id), owned(name))
    }

    /// Build a person. A missing nationality falls back to the default.
    pub fn make_person(
        &self,
        id: Option<&str>,
        name: Option<&str>,
        alias: Option<&str>,
        email: Option<&str>,
        nationality: Option<&str>,
        organization: Option<&Organization>,
    ) -> Result<Person, ValidationError> {
        let nationality = nationality.unwrap_or(&self.default_nationality);
        Person::new(
            owned(id),
            owned(name),
            owned(alias),
            owned(email),
            Some(nationality.to_string()),
            organization.cloned(),
        )
    }

    /// Build an organization from a field map keyed `group_id` and `name`.
    pub fn organization_from_fields(
        &self,
        fields: &HashMap<String, String>,
    ) -> Result<Organization, ValidationError> {
        self.make_organization(
            fields.get("group_id").map(String::as_str),
            fields.get("name").map(String::as_str),
        )
    }

    /// Build a person from a field map keyed `id`, `name`, `alias`, `email`
    /// and optionally `nationality`.
    pub fn person_from_fields(
        &self,
        fields: &HashMap<String, String>,
        organization: Option<&Organization>,
    ) -> Result<Person, ValidationError> {
        let get = |key: &str| fields.get(key).map(String::as_str);
        self.make_person(
            get("id"),
            get("name"),
            get("alias"),
            get("email"),
            get("nationality"),
            organization,
        )
    }

    /// Build the organization and person described by one roster row.
    ///
    /// `group` names the organization and `sort_name` becomes the alias.
    pub fn from_record(
        &self,
        columns: &ColumnIndex,
        record: &[String],
    ) -> Result<(Organization, Person), ValidationError> {
        let organization = self.make_organization(
            columns.field(record, consumer::GROUP_ID),
            columns.field(record, consumer::GROUP),
        )?;
        let person = self.make_person(
            columns.field(record, consumer::ID),
            columns.field(record, consumer::NAME),
            columns.field(record, consumer::SORT_NAME),
            columns.field(record, consumer::EMAIL),
            None,
            Some(&organization),
        )?;
        Ok((organization, person))
    }
}
