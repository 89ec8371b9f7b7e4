//! Editable table cell.
//!
//! A cell is bound to one field of one person and has two modes. In display
//! mode it renders the field; in edit mode it holds a draft string seeded
//! from the record. Committing validates the draft and yields a
//! [`FieldPatch`] for that single field, or nothing when the draft is
//! unchanged. Cancelling drops the draft.
//!
//! Cells never touch the store themselves. The page applies the patch.

use orbit_core::{Email, PersonId};
use serde::Serialize;
use thiserror::Error;

use crate::crm::{FieldPatch, FieldValue, Person, PersonField};

/// Errors raised by cell interactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    /// The field cannot be edited inline.
    #[error("field {0} is read-only")]
    ReadOnly(PersonField),

    /// The record is a placeholder still waiting on the server.
    #[error("record {0} is still being created")]
    RecordPending(PersonId),

    /// The operation needs edit mode.
    #[error("cell is not being edited")]
    NotEditing,

    /// The draft failed validation.
    #[error("invalid {field}: {reason}")]
    Invalid { field: PersonField, reason: String },
}

// =============================================================================
// Field definitions
// =============================================================================

/// How a field is rendered and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewFieldKind {
    /// Plain text.
    Text,
    /// Email address.
    Email,
    /// Absolute http(s) URL.
    Url,
    /// Phone number.
    Phone,
    /// Chip with the bound field as content and an optional avatar.
    Chip { avatar_field: Option<PersonField> },
    /// Relation shown by name; not editable inline.
    Relation,
}

/// A field as the table presents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewFieldDefinition {
    pub field: PersonField,
    pub label: String,
    pub kind: ViewFieldKind,
    /// Shown when the value is empty.
    pub placeholder: Option<String>,
}

impl ViewFieldDefinition {
    #[must_use]
    pub fn new(field: PersonField, label: &str, kind: ViewFieldKind) -> Self {
        Self {
            field,
            label: label.to_string(),
            kind,
            placeholder: None,
        }
    }

    /// Set the empty-value placeholder.
    #[must_use]
    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !matches!(self.kind, ViewFieldKind::Relation)
    }

    /// Render the display-mode view of this field for `person`.
    #[must_use]
    pub fn view(&self, person: &Person) -> CellView {
        let text = person.get(self.field).display_text();
        let avatar_url = match self.kind {
            ViewFieldKind::Chip {
                avatar_field: Some(avatar),
            } => Some(person.get(avatar).display_text()).filter(|s| !s.is_empty()),
            _ => None,
        };
        let placeholder = if text.is_empty() {
            self.placeholder.clone()
        } else {
            None
        };
        CellView {
            field: self.field,
            text,
            avatar_url,
            placeholder,
        }
    }

    /// Check a draft string and convert it into a value for this field.
    fn parse_draft(&self, draft: &str, current: &FieldValue) -> Result<FieldValue, CellError> {
        let trimmed = draft.trim();
        let invalid = |reason: String| CellError::Invalid {
            field: self.field,
            reason,
        };

        if !trimmed.is_empty() {
            match self.kind {
                ViewFieldKind::Email => {
                    Email::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
                }
                ViewFieldKind::Url => validate_url(trimmed).map_err(invalid)?,
                ViewFieldKind::Phone => validate_phone(trimmed).map_err(invalid)?,
                ViewFieldKind::Relation => return Err(CellError::ReadOnly(self.field)),
                ViewFieldKind::Text | ViewFieldKind::Chip { .. } => {}
            }
        }

        match current {
            FieldValue::Text(_) => Ok(FieldValue::Text(trimmed.to_string())),
            FieldValue::OptionalText(_) => Ok(FieldValue::OptionalText(
                Some(trimmed.to_string()).filter(|s| !s.is_empty()),
            )),
            FieldValue::Company(_) => Err(CellError::ReadOnly(self.field)),
        }
    }
}

fn validate_url(value: &str) -> Result<(), String> {
    let url = url::Url::parse(value).map_err(|e| e.to_string())?;
    if matches!(url.scheme(), "http" | "https") && url.host().is_some() {
        Ok(())
    } else {
        Err("must be an http(s) link".to_string())
    }
}

fn validate_phone(value: &str) -> Result<(), String> {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '));
    if !allowed {
        return Err("may only contain digits, spaces and + - ( ) .".to_string());
    }
    if !(4..=20).contains(&digits) {
        return Err("must have between 4 and 20 digits".to_string());
    }
    Ok(())
}

/// Display-mode rendering of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub field: PersonField,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

// =============================================================================
// Cell
// =============================================================================

/// Cell mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CellMode {
    Display,
    Edit { draft: String },
}

/// One cell of the table bound to `(person_id, field)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableCell {
    person_id: PersonId,
    definition: ViewFieldDefinition,
    mode: CellMode,
    /// Value the draft was seeded from.
    seed: Option<FieldValue>,
}

impl EditableCell {
    /// A cell in display mode.
    #[must_use]
    pub const fn new(person_id: PersonId, definition: ViewFieldDefinition) -> Self {
        Self {
            person_id,
            definition,
            mode: CellMode::Display,
            seed: None,
        }
    }

    #[must_use]
    pub const fn person_id(&self) -> &PersonId {
        &self.person_id
    }

    #[must_use]
    pub const fn field(&self) -> PersonField {
        self.definition.field
    }

    #[must_use]
    pub const fn mode(&self) -> &CellMode {
        &self.mode
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        matches!(self.mode, CellMode::Edit { .. })
    }

    /// Enter edit mode with a draft seeded from `record`.
    ///
    /// Activating a cell that is already editing keeps its draft.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnly` for relation fields and `RecordPending` when
    /// `pending_creation` is set.
    pub fn activate(&mut self, record: &Person, pending_creation: bool) -> Result<(), CellError> {
        if !self.definition.is_editable() {
            return Err(CellError::ReadOnly(self.definition.field));
        }
        if pending_creation {
            return Err(CellError::RecordPending(self.person_id.clone()));
        }
        if self.is_editing() {
            return Ok(());
        }
        let value = record.get(self.definition.field);
        self.mode = CellMode::Edit {
            draft: value.display_text(),
        };
        self.seed = Some(value);
        Ok(())
    }

    /// Replace the draft.
    ///
    /// # Errors
    ///
    /// Returns `NotEditing` in display mode.
    pub fn set_draft(&mut self, value: impl Into<String>) -> Result<(), CellError> {
        match &mut self.mode {
            CellMode::Edit { draft } => {
                *draft = value.into();
                Ok(())
            }
            CellMode::Display => Err(CellError::NotEditing),
        }
    }

    /// Drop the draft and return to display mode.
    pub fn cancel(&mut self) {
        self.mode = CellMode::Display;
        self.seed = None;
    }

    /// Validate the draft and leave edit mode.
    ///
    /// Returns `None` when the draft matches the seeded value. On a
    /// validation error the cell stays in edit mode so the draft can be
    /// corrected.
    ///
    /// # Errors
    ///
    /// Returns `NotEditing` in display mode or `Invalid` for a bad draft.
    pub fn commit(&mut self) -> Result<Option<FieldPatch>, CellError> {
        let (CellMode::Edit { draft }, Some(seed)) = (&self.mode, &self.seed) else {
            return Err(CellError::NotEditing);
        };
        let value = self.definition.parse_draft(draft, seed)?;
        let changed = value != *seed;
        self.cancel();
        Ok(changed.then(|| FieldPatch::new(self.definition.field, value)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ada() -> Person {
        let mut p = Person::placeholder(PersonId::new("p1"));
        p.first_name = "Ada".into();
        p.email = Some("ada@example.com".into());
        p.avatar_url = Some("https://img.example.com/ada.png".into());
        p
    }

    fn cell(field: PersonField, kind: ViewFieldKind) -> EditableCell {
        EditableCell::new(
            PersonId::new("p1"),
            ViewFieldDefinition::new(field, "Label", kind),
        )
    }

    #[test]
    fn test_starts_in_display_mode() {
        let c = cell(PersonField::City, ViewFieldKind::Text);
        assert_eq!(c.mode(), &CellMode::Display);
    }

    #[test]
    fn test_activate_seeds_draft() {
        let mut c = cell(PersonField::Email, ViewFieldKind::Email);
        c.activate(&ada(), false).unwrap();
        assert_eq!(
            c.mode(),
            &CellMode::Edit {
                draft: "ada@example.com".into()
            }
        );
    }

    #[test]
    fn test_commit_changed_draft_yields_patch() {
        let mut c = cell(PersonField::FirstName, ViewFieldKind::Text);
        c.activate(&ada(), false).unwrap();
        c.set_draft("  Augusta ").unwrap();
        let patch = c.commit().unwrap().unwrap();
        assert_eq!(patch.field, PersonField::FirstName);
        assert_eq!(patch.value, FieldValue::Text("Augusta".into()));
        assert!(!c.is_editing());
    }

    #[test]
    fn test_commit_unchanged_draft_yields_nothing() {
        let mut c = cell(PersonField::FirstName, ViewFieldKind::Text);
        c.activate(&ada(), false).unwrap();
        assert_eq!(c.commit().unwrap(), None);
        assert!(!c.is_editing());
    }

    #[test]
    fn test_clearing_optional_field() {
        let mut c = cell(PersonField::Email, ViewFieldKind::Email);
        c.activate(&ada(), false).unwrap();
        c.set_draft("").unwrap();
        let patch = c.commit().unwrap().unwrap();
        assert_eq!(patch.value, FieldValue::OptionalText(None));
    }

    #[test]
    fn test_invalid_email_keeps_edit_mode() {
        let mut c = cell(PersonField::Email, ViewFieldKind::Email);
        c.activate(&ada(), false).unwrap();
        c.set_draft("not-an-email").unwrap();
        assert!(matches!(c.commit(), Err(CellError::Invalid { .. })));
        assert!(c.is_editing());
    }

    #[test]
    fn test_url_validation() {
        let mut c = cell(PersonField::LinkedinUrl, ViewFieldKind::Url);
        c.activate(&ada(), false).unwrap();
        c.set_draft("ftp://files.example.com").unwrap();
        assert!(c.commit().is_err());
        c.set_draft("https://www.linkedin.com/in/ada").unwrap();
        assert!(c.commit().unwrap().is_some());
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone("+33 (0)1 23 45 67 89").is_ok());
        assert!(validate_phone("12").is_err());
        assert!(validate_phone("call me").is_err());
    }

    #[test]
    fn test_cancel_discards_draft() {
        let mut c = cell(PersonField::City, ViewFieldKind::Text);
        c.activate(&ada(), false).unwrap();
        c.set_draft("Paris").unwrap();
        c.cancel();
        assert_eq!(c.mode(), &CellMode::Display);
        assert_eq!(c.commit(), Err(CellError::NotEditing));
    }

    #[test]
    fn test_relation_is_read_only() {
        let mut c = cell(PersonField::Company, ViewFieldKind::Relation);
        assert_eq!(
            c.activate(&ada(), false),
            Err(CellError::ReadOnly(PersonField::Company))
        );
    }

    #[test]
    fn test_pending_record_refuses_activation() {
        let mut c = cell(PersonField::City, ViewFieldKind::Text);
        assert!(matches!(
            c.activate(&ada(), true),
            Err(CellError::RecordPending(_))
        ));
    }

    #[test]
    fn test_chip_view_includes_avatar() {
        let def = ViewFieldDefinition::new(
            PersonField::FirstName,
            "Name",
            ViewFieldKind::Chip {
                avatar_field: Some(PersonField::AvatarUrl),
            },
        );
        let view = def.view(&ada());
        assert_eq!(view.text, "Ada");
        assert_eq!(
            view.avatar_url.as_deref(),
            Some("https://img.example.com/ada.png")
        );
    }

    #[test]
    fn test_placeholder_shown_for_empty_value() {
        let def = ViewFieldDefinition::new(PersonField::City, "City", ViewFieldKind::Text)
            .placeholder("City");
        let view = def.view(&Person::placeholder(PersonId::new("p2")));
        assert_eq!(view.placeholder.as_deref(), Some("City"));
    }
}
