//! Data table component types.
//!
//! These types define the configuration for the entity table: its columns,
//! the field each column is bound to, and the empty state.

use serde::Serialize;

use crate::crm::{PersonField, PersonSortKey};

use super::editable_cell::{ViewFieldDefinition, ViewFieldKind};

/// Column definition for a data table.
#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    /// Unique key for the column.
    pub key: String,
    /// Display label for the column header.
    pub label: String,
    /// Whether the column is sortable.
    pub sortable: bool,
    /// Whether the column is visible by default.
    pub default_visible: bool,
    /// Field rendered in this column's cells.
    pub view_field: ViewFieldDefinition,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub fn sortable(key: &str, view_field: ViewFieldDefinition) -> Self {
        Self {
            key: key.to_string(),
            label: view_field.label.clone(),
            sortable: true,
            default_visible: true,
            view_field,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub fn new(key: &str, view_field: ViewFieldDefinition) -> Self {
        Self {
            key: key.to_string(),
            label: view_field.label.clone(),
            sortable: false,
            default_visible: true,
            view_field,
        }
    }

    /// Set whether the column is visible by default.
    #[must_use]
    pub const fn visible(mut self, visible: bool) -> Self {
        self.default_visible = visible;
        self
    }

    /// Server-side sort key matching this column, if the API supports one.
    #[must_use]
    pub const fn server_sort_key(&self) -> Option<PersonSortKey> {
        match self.view_field.field {
            PersonField::FirstName => Some(PersonSortKey::FirstName),
            PersonField::LastName => Some(PersonSortKey::LastName),
            PersonField::Email => Some(PersonSortKey::Email),
            PersonField::City => Some(PersonSortKey::City),
            _ => None,
        }
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone, Serialize)]
pub struct DataTableConfig {
    /// Unique table identifier.
    pub table_id: String,
    /// Column definitions.
    pub columns: Vec<TableColumn>,
    /// Icon for empty state.
    pub empty_icon: String,
    /// Title for empty state.
    pub empty_title: String,
    /// Description for empty state.
    pub empty_description: Option<String>,
    /// Whether to show the action bar on selection.
    pub has_bulk_actions: bool,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub fn new(table_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            columns: vec![],
            empty_icon: "ph-list".to_string(),
            empty_title: "No items found".to_string(),
            empty_description: None,
            has_bulk_actions: false,
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Enable the action bar.
    #[must_use]
    pub const fn bulk_actions(mut self) -> Self {
        self.has_bulk_actions = true;
        self
    }

    /// Set the empty state.
    #[must_use]
    pub fn empty_state(mut self, icon: &str, title: &str, description: Option<&str>) -> Self {
        self.empty_icon = icon.to_string();
        self.empty_title = title.to_string();
        self.empty_description = description.map(String::from);
        self
    }

    /// Find a column by key.
    #[must_use]
    pub fn column_by_key(&self, key: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Find the column bound to a field.
    #[must_use]
    pub fn column_for_field(&self, field: PersonField) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.view_field.field == field)
    }
}

/// Column layout of the People table.
#[must_use]
pub fn people_table_config() -> DataTableConfig {
    DataTableConfig::new("people")
        .column(TableColumn::sortable(
            "name",
            ViewFieldDefinition::new(
                PersonField::FirstName,
                "Name",
                ViewFieldKind::Chip {
                    avatar_field: Some(PersonField::AvatarUrl),
                },
            )
            .placeholder("First name"),
        ))
        .column(TableColumn::sortable(
            "last_name",
            ViewFieldDefinition::new(PersonField::LastName, "Last name", ViewFieldKind::Text)
                .placeholder("Last name"),
        ))
        .column(TableColumn::sortable(
            "email",
            ViewFieldDefinition::new(PersonField::Email, "Email", ViewFieldKind::Email)
                .placeholder("Email"),
        ))
        .column(TableColumn::new(
            "company",
            ViewFieldDefinition::new(PersonField::Company, "Company", ViewFieldKind::Relation),
        ))
        .column(TableColumn::new(
            "phone",
            ViewFieldDefinition::new(PersonField::Phone, "Phone", ViewFieldKind::Phone)
                .placeholder("Phone"),
        ))
        .column(TableColumn::sortable(
            "city",
            ViewFieldDefinition::new(PersonField::City, "City", ViewFieldKind::Text)
                .placeholder("City"),
        ))
        .column(TableColumn::sortable(
            "job_title",
            ViewFieldDefinition::new(PersonField::JobTitle, "Job Title", ViewFieldKind::Text)
                .placeholder("Job Title"),
        ))
        .column(
            TableColumn::new(
                "linkedin",
                ViewFieldDefinition::new(PersonField::LinkedinUrl, "LinkedIn", ViewFieldKind::Url)
                    .placeholder("LinkedIn"),
            )
            .visible(false),
        )
        .column(
            TableColumn::new(
                "x",
                ViewFieldDefinition::new(PersonField::XUrl, "X", ViewFieldKind::Url)
                    .placeholder("X"),
            )
            .visible(false),
        )
        .bulk_actions()
        .empty_state(
            "ph-user",
            "No people yet",
            Some("Add a person to get started."),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_people_config_keys_are_unique() {
        let config = people_table_config();
        let mut keys: Vec<_> = config.columns.iter().map(|c| c.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), config.columns.len());
    }

    #[test]
    fn test_company_column_is_read_only() {
        let config = people_table_config();
        let company = config.column_by_key("company");
        assert!(company.is_some_and(|c| !c.view_field.is_editable() && !c.sortable));
    }

    #[test]
    fn test_server_sort_key() {
        let config = people_table_config();
        assert_eq!(
            config.column_by_key("city").and_then(TableColumn::server_sort_key),
            Some(PersonSortKey::City)
        );
        assert_eq!(
            config.column_by_key("job_title").and_then(TableColumn::server_sort_key),
            None
        );
    }
}
