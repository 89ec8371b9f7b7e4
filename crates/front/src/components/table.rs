//! Entity table bound to the record store.
//!
//! The table owns only UI state (sort, page, selection, the cell being
//! edited). Rows are derived from the store on every render, so a row can
//! never outlive its store entry.

use std::collections::BTreeSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use orbit_core::{PersonId, RecordState};
use serde::Serialize;
use thiserror::Error;

use crate::crm::{FieldPatch, Person, PersonField, SortDirection};
use crate::store::{RecordEntry, RecordStore};

use super::data_table::{DataTableConfig, TableColumn};
use super::editable_cell::{CellError, CellMode, CellView, EditableCell};

/// Errors raised by table interactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("column {0} is not sortable")]
    NotSortable(String),

    #[error("no column shows field {0}")]
    UnknownField(PersonField),

    #[error("person {0} is not in the table")]
    RowNotFound(PersonId),

    #[error(transparent)]
    Cell(#[from] CellError),
}

/// Active sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortState {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug)]
struct TableState {
    sort: Option<SortState>,
    page: usize,
    page_size: usize,
    selection: BTreeSet<PersonId>,
    editing: Option<EditableCell>,
}

// =============================================================================
// View models
// =============================================================================

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub id: PersonId,
    pub state: RecordState,
    pub selected: bool,
    /// Field being edited on this row, with its draft.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editing: Option<EditingCell>,
    pub cells: Vec<CellView>,
    pub record: Person,
}

/// The cell in edit mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditingCell {
    pub field: PersonField,
    pub draft: String,
}

/// Header of a visible column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorted: Option<SortDirection>,
}

/// Empty-state block shown when the table has no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub icon: String,
    pub title: String,
    pub description: Option<String>,
}

/// One rendered page of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePage {
    pub columns: Vec<ColumnHeader>,
    pub rows: Vec<TableRow>,
    pub page: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub total_pages: usize,
    pub selected_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty: Option<EmptyState>,
}

// =============================================================================
// EntityTable
// =============================================================================

/// Paginated, sortable grid over the record store.
pub struct EntityTable {
    config: DataTableConfig,
    store: RecordStore,
    state: RwLock<TableState>,
}

impl EntityTable {
    #[must_use]
    pub fn new(config: DataTableConfig, store: RecordStore, page_size: usize) -> Self {
        Self {
            config,
            store,
            state: RwLock::new(TableState {
                sort: None,
                page: 0,
                page_size: page_size.max(1),
                selection: BTreeSet::new(),
                editing: None,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TableState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TableState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn config(&self) -> &DataTableConfig {
        &self.config
    }

    // =========================================================================
    // Sorting and paging
    // =========================================================================

    /// Sort by a column. Resets to the first page.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` or `NotSortable`.
    pub fn set_sort(&self, column: &str, direction: SortDirection) -> Result<(), TableError> {
        let col = self
            .config
            .column_by_key(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        if !col.sortable {
            return Err(TableError::NotSortable(column.to_string()));
        }
        let mut state = self.write();
        state.sort = Some(SortState {
            column: column.to_string(),
            direction,
        });
        state.page = 0;
        Ok(())
    }

    /// Go back to store order.
    pub fn clear_sort(&self) {
        self.write().sort = None;
    }

    #[must_use]
    pub fn sort(&self) -> Option<SortState> {
        self.read().sort.clone()
    }

    /// Column of the active sort.
    #[must_use]
    pub fn sort_column(&self) -> Option<&TableColumn> {
        let key = self.read().sort.as_ref().map(|s| s.column.clone())?;
        self.config.column_by_key(&key)
    }

    /// Select a page (0-based). Out-of-range pages clamp on render.
    pub fn set_page(&self, page: usize) {
        self.write().page = page;
    }

    pub fn set_page_size(&self, page_size: usize) {
        let mut state = self.write();
        state.page_size = page_size.max(1);
        state.page = 0;
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Flip selection of one row. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` for ids not in the store.
    pub fn toggle(&self, id: &PersonId) -> Result<bool, TableError> {
        self.ensure_row(id)?;
        let mut state = self.write();
        if state.selection.remove(id) {
            Ok(false)
        } else {
            state.selection.insert(id.clone());
            Ok(true)
        }
    }

    /// Select exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` for ids not in the store.
    pub fn select_only(&self, id: &PersonId) -> Result<(), TableError> {
        self.ensure_row(id)?;
        let mut state = self.write();
        state.selection.clear();
        state.selection.insert(id.clone());
        Ok(())
    }

    /// Replace the selection. Ids not in the store are ignored.
    pub fn set_selection(&self, ids: &[PersonId]) -> usize {
        let selection: BTreeSet<PersonId> = ids
            .iter()
            .filter(|id| self.store.contains(id))
            .cloned()
            .collect();
        let count = selection.len();
        self.write().selection = selection;
        count
    }

    /// Add every row of the current page to the selection.
    pub fn select_all_on_page(&self) {
        let ids: Vec<PersonId> = self.render().rows.into_iter().map(|r| r.id).collect();
        self.write().selection.extend(ids);
    }

    pub fn clear_selection(&self) {
        self.write().selection.clear();
    }

    #[must_use]
    pub fn is_selected(&self, id: &PersonId) -> bool {
        self.read().selection.contains(id)
    }

    /// Selected ids still in the store, in store order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<PersonId> {
        let ids = self.store.ids();
        let mut state = self.write();
        state.selection.retain(|id| ids.contains(id));
        ids.into_iter()
            .filter(|id| state.selection.contains(id))
            .collect()
    }

    fn ensure_row(&self, id: &PersonId) -> Result<(), TableError> {
        if self.store.contains(id) {
            Ok(())
        } else {
            Err(TableError::RowNotFound(id.clone()))
        }
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Put the cell for `(id, field)` into edit mode.
    ///
    /// Any other cell being edited is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound`, `UnknownField`, or the cell's activation error.
    pub fn begin_edit(&self, id: &PersonId, field: PersonField) -> Result<CellMode, TableError> {
        let entry = self
            .store
            .entry(id)
            .ok_or_else(|| TableError::RowNotFound(id.clone()))?;
        let column = self
            .config
            .column_for_field(field)
            .ok_or(TableError::UnknownField(field))?;

        let mut state = self.write();
        let mut cell = match state.editing.take() {
            Some(cell) if cell.person_id() == id && cell.field() == field => cell,
            _ => EditableCell::new(id.clone(), column.view_field.clone()),
        };
        cell.activate(entry.current(), entry.is_pending_creation())?;
        let mode = cell.mode().clone();
        state.editing = Some(cell);
        Ok(mode)
    }

    /// Replace the draft of the cell being edited.
    ///
    /// # Errors
    ///
    /// Returns `NotEditing` if no cell is being edited.
    pub fn set_draft(&self, value: impl Into<String>) -> Result<(), TableError> {
        let mut state = self.write();
        let cell = state.editing.as_mut().ok_or(CellError::NotEditing)?;
        cell.set_draft(value)?;
        Ok(())
    }

    /// Drop the cell being edited without touching the store.
    pub fn cancel_edit(&self) {
        if let Some(mut cell) = self.write().editing.take() {
            cell.cancel();
        }
    }

    /// Commit the cell being edited.
    ///
    /// Returns the patch to apply, or `None` for an unchanged draft. An
    /// invalid draft keeps the cell in edit mode.
    ///
    /// # Errors
    ///
    /// Returns `NotEditing` or `Invalid`.
    pub fn commit_edit(&self) -> Result<Option<(PersonId, FieldPatch)>, TableError> {
        let mut state = self.write();
        let cell = state.editing.as_mut().ok_or(CellError::NotEditing)?;
        let patch = cell.commit()?;
        let id = cell.person_id().clone();
        state.editing = None;
        Ok(patch.map(|p| (id, p)))
    }

    /// The cell being edited, if any.
    #[must_use]
    pub fn editing(&self) -> Option<(PersonId, PersonField)> {
        self.read()
            .editing
            .as_ref()
            .map(|c| (c.person_id().clone(), c.field()))
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render the current page from the store.
    #[must_use]
    pub fn render(&self) -> TablePage {
        let mut entries = self.store.snapshot();
        let mut state = self.write();

        state
            .selection
            .retain(|id| entries.iter().any(|e| &e.current().id == id));
        if state
            .editing
            .as_ref()
            .is_some_and(|c| !entries.iter().any(|e| &e.current().id == c.person_id()))
        {
            state.editing = None;
        }

        let sort_column = state
            .sort
            .as_ref()
            .and_then(|s| self.config.column_by_key(&s.column).map(|c| (c, s.direction)));
        sort_entries(&mut entries, sort_column);

        let total_rows = entries.len();
        let total_pages = total_rows.div_ceil(state.page_size).max(1);
        state.page = state.page.min(total_pages - 1);
        let page = state.page;
        let page_size = state.page_size;

        let visible: Vec<&TableColumn> = self
            .config
            .columns
            .iter()
            .filter(|c| c.default_visible)
            .collect();

        let rows = entries
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .map(|entry| {
                let person = entry.current().clone();
                let editing = state.editing.as_ref().and_then(|c| {
                    match (c.person_id() == &person.id, c.mode()) {
                        (true, CellMode::Edit { draft }) => Some(EditingCell {
                            field: c.field(),
                            draft: draft.clone(),
                        }),
                        _ => None,
                    }
                });
                TableRow {
                    selected: state.selection.contains(&person.id),
                    state: entry.state(),
                    editing,
                    cells: visible.iter().map(|c| c.view_field.view(&person)).collect(),
                    id: person.id.clone(),
                    record: person,
                }
            })
            .collect();

        let columns = visible
            .iter()
            .map(|c| ColumnHeader {
                key: c.key.clone(),
                label: c.label.clone(),
                sortable: c.sortable,
                sorted: state
                    .sort
                    .as_ref()
                    .filter(|s| s.column == c.key)
                    .map(|s| s.direction),
            })
            .collect();

        let empty = (total_rows == 0).then(|| EmptyState {
            icon: self.config.empty_icon.clone(),
            title: self.config.empty_title.clone(),
            description: self.config.empty_description.clone(),
        });

        TablePage {
            columns,
            rows,
            page,
            page_size,
            total_rows,
            total_pages,
            selected_count: state.selection.len(),
            empty,
        }
    }

    /// Render a single row, wherever it sits in the table.
    #[must_use]
    pub fn row(&self, id: &PersonId) -> Option<TableRow> {
        let entry = self.store.entry(id)?;
        let state = self.read();
        let person = entry.current().clone();
        Some(TableRow {
            id: person.id.clone(),
            state: entry.state(),
            selected: state.selection.contains(id),
            editing: state.editing.as_ref().and_then(|c| match c.mode() {
                CellMode::Edit { draft } if c.person_id() == id => Some(EditingCell {
                    field: c.field(),
                    draft: draft.clone(),
                }),
                _ => None,
            }),
            cells: self
                .config
                .columns
                .iter()
                .filter(|c| c.default_visible)
                .map(|c| c.view_field.view(&person))
                .collect(),
            record: person,
        })
    }
}

/// Order entries for display.
///
/// Placeholders stay pinned on top. Ties are broken by id so the order is
/// stable across renders.
fn sort_entries(entries: &mut [RecordEntry], sort: Option<(&TableColumn, SortDirection)>) {
    let Some((column, direction)) = sort else {
        entries.sort_by_key(|e| !e.is_pending_creation());
        return;
    };
    let field = column.view_field.field;
    entries.sort_by(|a, b| {
        let pinned = b.is_pending_creation().cmp(&a.is_pending_creation());
        let by_value = || {
            let av = a.current().get(field).display_text().to_lowercase();
            let bv = b.current().get(field).display_text().to_lowercase();
            match direction {
                SortDirection::Asc => av.cmp(&bv),
                SortDirection::Desc => bv.cmp(&av),
            }
        };
        pinned
            .then_with(by_value)
            .then_with(|| a.current().id.cmp(&b.current().id))
    });
}

impl std::fmt::Debug for EntityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityTable")
            .field("table_id", &self.config.table_id)
            .field("state", &*self.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::components::data_table::people_table_config;
    use crate::crm::FieldValue;

    fn person(id: &str, first: &str, city: &str) -> Person {
        let mut p = Person::placeholder(PersonId::new(id));
        p.first_name = first.into();
        p.city = Some(city.into());
        p
    }

    fn table(page_size: usize) -> (EntityTable, RecordStore) {
        let store = RecordStore::new();
        store.load(vec![
            person("1", "Carol", "Berlin"),
            person("2", "alice", "Austin"),
            person("3", "Bob", "Cairo"),
        ]);
        (
            EntityTable::new(people_table_config(), store.clone(), page_size),
            store,
        )
    }

    fn ids(page: &TablePage) -> Vec<&str> {
        page.rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_render_in_store_order() {
        let (t, _) = table(10);
        let page = t.render();
        assert_eq!(ids(&page), vec!["1", "2", "3"]);
        assert_eq!(page.total_pages, 1);
        assert!(page.empty.is_none());
    }

    #[test]
    fn test_sort_case_insensitive_both_directions() {
        let (t, _) = table(10);
        t.set_sort("name", SortDirection::Asc).unwrap();
        assert_eq!(ids(&t.render()), vec!["2", "3", "1"]);
        t.set_sort("city", SortDirection::Desc).unwrap();
        assert_eq!(ids(&t.render()), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_sort_ties_break_on_id() {
        let (t, store) = table(10);
        store.load(vec![person("0", "Bob", "Cairo")]);
        t.set_sort("city", SortDirection::Asc).unwrap();
        assert_eq!(ids(&t.render()), vec!["2", "1", "0", "3"]);
    }

    #[test]
    fn test_sort_rejects_unsortable_column() {
        let (t, _) = table(10);
        assert_eq!(
            t.set_sort("company", SortDirection::Asc),
            Err(TableError::NotSortable("company".into()))
        );
        assert!(matches!(
            t.set_sort("nope", SortDirection::Asc),
            Err(TableError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_placeholder_pinned_on_top_when_sorted() {
        let (t, store) = table(10);
        t.set_sort("name", SortDirection::Desc).unwrap();
        store
            .insert_optimistic(Person::placeholder(PersonId::new("new")))
            .unwrap();
        let page = t.render();
        assert_eq!(page.rows[0].id.as_str(), "new");
        assert_eq!(page.rows[0].state, RecordState::Pending);
    }

    #[test]
    fn test_pagination_clamps() {
        let (t, _) = table(2);
        t.set_page(1);
        let page = t.render();
        assert_eq!(ids(&page), vec!["3"]);
        assert_eq!(page.total_pages, 2);

        t.set_page(9);
        assert_eq!(t.render().page, 1);
    }

    #[test]
    fn test_empty_state() {
        let t = EntityTable::new(people_table_config(), RecordStore::new(), 10);
        let page = t.render();
        assert!(page.rows.is_empty());
        assert_eq!(page.empty.unwrap().title, "No people yet");
    }

    #[test]
    fn test_selection_is_pruned_when_rows_leave() {
        let (t, store) = table(10);
        t.toggle(&PersonId::new("1")).unwrap();
        t.toggle(&PersonId::new("3")).unwrap();
        store.remove_many(&[PersonId::new("1")]).unwrap();

        assert_eq!(t.selected_ids(), vec![PersonId::new("3")]);
        assert_eq!(t.render().selected_count, 1);
    }

    #[test]
    fn test_select_all_on_page_and_clear() {
        let (t, _) = table(2);
        t.select_all_on_page();
        assert_eq!(t.selected_ids().len(), 2);
        assert!(!t.is_selected(&PersonId::new("3")));
        t.clear_selection();
        assert!(t.selected_ids().is_empty());
    }

    #[test]
    fn test_set_selection_ignores_unknown_ids() {
        let (t, _) = table(10);
        let count = t.set_selection(&[PersonId::new("2"), PersonId::new("ghost")]);
        assert_eq!(count, 1);
        assert_eq!(t.selected_ids(), vec![PersonId::new("2")]);
    }

    #[test]
    fn test_toggle_unknown_row() {
        let (t, _) = table(10);
        assert!(matches!(
            t.toggle(&PersonId::new("ghost")),
            Err(TableError::RowNotFound(_))
        ));
    }

    #[test]
    fn test_edit_commit_yields_patch() {
        let (t, _) = table(10);
        let id = PersonId::new("1");
        t.begin_edit(&id, PersonField::City).unwrap();
        t.set_draft("Hamburg").unwrap();

        let row = t.row(&id).unwrap();
        assert_eq!(row.editing.unwrap().draft, "Hamburg");

        let (patched_id, patch) = t.commit_edit().unwrap().unwrap();
        assert_eq!(patched_id, id);
        assert_eq!(patch.value, FieldValue::OptionalText(Some("Hamburg".into())));
        assert!(t.editing().is_none());
    }

    #[test]
    fn test_edit_on_unlisted_field() {
        let (t, _) = table(10);
        assert_eq!(
            t.begin_edit(&PersonId::new("1"), PersonField::AvatarUrl),
            Err(TableError::UnknownField(PersonField::AvatarUrl))
        );
    }

    #[test]
    fn test_edit_dropped_when_row_removed() {
        let (t, store) = table(10);
        let id = PersonId::new("1");
        t.begin_edit(&id, PersonField::City).unwrap();
        store.remove_many(std::slice::from_ref(&id)).unwrap();
        let _ = t.render();
        assert!(t.editing().is_none());
    }
}
