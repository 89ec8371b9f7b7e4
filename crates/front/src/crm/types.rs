//! Domain types for people and their relations.

use chrono::{DateTime, Utc};
use orbit_core::{CompanyId, FavoriteId, PersonId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Records
// =============================================================================

/// Company referenced by a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: CompanyId,
    pub name: String,
    pub domain_name: String,
}

/// A favorite pointing at a person or a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRef {
    pub id: FavoriteId,
    pub person_id: Option<PersonId>,
    pub company_id: Option<CompanyId>,
}

/// A person record as cached on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub job_title: Option<String>,
    pub linkedin_url: Option<String>,
    pub x_url: Option<String>,
    pub avatar_url: Option<String>,
    /// Server-populated; `None` until the server confirms the record.
    pub created_at: Option<DateTime<Utc>>,
    pub activity_count: i64,
    pub company: Option<CompanyRef>,
    pub favorites: Vec<FavoriteRef>,
}

impl Person {
    /// Placeholder shown while a creation is in flight.
    ///
    /// Name fields start empty and are filled in by later edits.
    #[must_use]
    pub const fn placeholder(id: PersonId) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            display_name: String::new(),
            email: None,
            phone: None,
            city: None,
            job_title: None,
            linkedin_url: None,
            x_url: None,
            avatar_url: None,
            created_at: None,
            activity_count: 0,
            company: None,
            favorites: Vec::new(),
        }
    }

    /// Read one field as a [`FieldValue`].
    #[must_use]
    pub fn get(&self, field: PersonField) -> FieldValue {
        match field {
            PersonField::FirstName => FieldValue::Text(self.first_name.clone()),
            PersonField::LastName => FieldValue::Text(self.last_name.clone()),
            PersonField::Email => FieldValue::OptionalText(self.email.clone()),
            PersonField::Phone => FieldValue::OptionalText(self.phone.clone()),
            PersonField::City => FieldValue::OptionalText(self.city.clone()),
            PersonField::JobTitle => FieldValue::OptionalText(self.job_title.clone()),
            PersonField::LinkedinUrl => FieldValue::OptionalText(self.linkedin_url.clone()),
            PersonField::XUrl => FieldValue::OptionalText(self.x_url.clone()),
            PersonField::AvatarUrl => FieldValue::OptionalText(self.avatar_url.clone()),
            PersonField::Company => FieldValue::Company(self.company.clone()),
        }
    }

    /// Overwrite one field. Returns `false` if the value kind does not fit.
    pub fn set(&mut self, field: PersonField, value: FieldValue) -> bool {
        match (field, value) {
            (PersonField::FirstName, FieldValue::Text(v)) => self.first_name = v,
            (PersonField::LastName, FieldValue::Text(v)) => self.last_name = v,
            (PersonField::Email, FieldValue::OptionalText(v)) => self.email = v,
            (PersonField::Phone, FieldValue::OptionalText(v)) => self.phone = v,
            (PersonField::City, FieldValue::OptionalText(v)) => self.city = v,
            (PersonField::JobTitle, FieldValue::OptionalText(v)) => self.job_title = v,
            (PersonField::LinkedinUrl, FieldValue::OptionalText(v)) => self.linkedin_url = v,
            (PersonField::XUrl, FieldValue::OptionalText(v)) => self.x_url = v,
            (PersonField::AvatarUrl, FieldValue::OptionalText(v)) => self.avatar_url = v,
            (PersonField::Company, FieldValue::Company(v)) => self.company = v,
            _ => return false,
        }
        true
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Editable person fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonField {
    FirstName,
    LastName,
    Email,
    Phone,
    City,
    JobTitle,
    LinkedinUrl,
    XUrl,
    AvatarUrl,
    Company,
}

impl PersonField {
    /// All editable fields.
    pub const ALL: [Self; 10] = [
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::City,
        Self::JobTitle,
        Self::LinkedinUrl,
        Self::XUrl,
        Self::AvatarUrl,
        Self::Company,
    ];

    /// Parse a field from a URL path segment.
    #[must_use]
    pub fn from_str_param(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Get the URL parameter string for this field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::City => "city",
            Self::JobTitle => "job_title",
            Self::LinkedinUrl => "linkedin_url",
            Self::XUrl => "x_url",
            Self::AvatarUrl => "avatar_url",
            Self::Company => "company",
        }
    }
}

impl std::fmt::Display for PersonField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single person field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Required text (names).
    Text(String),
    /// Nullable text (contact fields, URLs).
    OptionalText(Option<String>),
    /// Company relation.
    Company(Option<CompanyRef>),
}

impl FieldValue {
    /// Text shown in display mode.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(v) => v.clone(),
            Self::OptionalText(v) => v.clone().unwrap_or_default(),
            Self::Company(v) => v.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
        }
    }
}

/// A single-field change scoped to one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPatch {
    pub field: PersonField,
    pub value: FieldValue,
}

impl FieldPatch {
    #[must_use]
    pub const fn new(field: PersonField, value: FieldValue) -> Self {
        Self { field, value }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Initial values sent with a creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonDraft {
    /// Client-generated id.
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
}

impl PersonDraft {
    /// Draft with empty name fields.
    #[must_use]
    pub const fn empty(id: PersonId) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
        }
    }
}

/// Sort direction for list queries and tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction from a URL parameter string.
    #[must_use]
    pub fn from_str_param(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Server-side sort key for people lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonSortKey {
    FirstName,
    LastName,
    Email,
    City,
    CreatedAt,
}

/// Parameters for listing people.
#[derive(Debug, Clone, Default)]
pub struct PeopleListParams {
    pub sort: Option<(PersonSortKey, SortDirection)>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_has_empty_names() {
        let p = Person::placeholder(PersonId::new("p1"));
        assert!(p.first_name.is_empty());
        assert!(p.last_name.is_empty());
        assert!(p.display_name.is_empty());
        assert!(p.created_at.is_none());
    }

    #[test]
    fn test_set_then_get() {
        let mut p = Person::placeholder(PersonId::new("p1"));
        assert!(p.set(PersonField::City, FieldValue::OptionalText(Some("Paris".into()))));
        assert_eq!(
            p.get(PersonField::City),
            FieldValue::OptionalText(Some("Paris".into()))
        );
    }

    #[test]
    fn test_set_rejects_mismatched_kind() {
        let mut p = Person::placeholder(PersonId::new("p1"));
        assert!(!p.set(PersonField::FirstName, FieldValue::OptionalText(None)));
        assert!(p.first_name.is_empty());
    }

    #[test]
    fn test_field_param_roundtrip() {
        for field in PersonField::ALL {
            assert_eq!(PersonField::from_str_param(field.as_str()), Some(field));
        }
        assert_eq!(PersonField::from_str_param("nope"), None);
    }

    #[test]
    fn test_display_text() {
        let company = CompanyRef {
            id: CompanyId::new("c1"),
            name: "Acme".into(),
            domain_name: "acme.com".into(),
        };
        assert_eq!(FieldValue::Company(Some(company)).display_text(), "Acme");
        assert_eq!(FieldValue::OptionalText(None).display_text(), "");
    }
}
