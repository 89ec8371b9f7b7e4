//! People page.
//!
//! Composes the entity table, the action bar and the context menu over a
//! shared [`RecordStore`], and wires user actions to server mutations.
//! Every mutating method applies its optimistic store change before it
//! returns and hands the server round-trip to the [`MutationDispatcher`].

use std::sync::Arc;

use orbit_core::PersonId;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::commands::{Mutation, MutationDispatcher, MutationTicket};
use crate::components::action_bar::{
    ActionBar, ActionBarView, ActionError, ActionHandler, people_action_bar,
};
use crate::components::context_menu::{ContextMenu, ContextMenuView, MenuPosition};
use crate::components::data_table::people_table_config;
use crate::components::editable_cell::CellMode;
use crate::components::table::{EntityTable, TableError, TablePage, TableRow};
use crate::crm::{
    CrmError, PeopleApi, PeopleListParams, Person, PersonDraft, PersonField, SortDirection,
};
use crate::notices::NoticeBoard;
use crate::store::{RecordStore, StoreError};

/// Errors returned by page operations.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Result of running an action-bar command.
#[derive(Debug)]
pub enum ActionOutcome {
    /// Rows were removed locally; the ticket tracks the server delete.
    Deleting(MutationTicket),
    SelectionCleared,
}

/// Everything the page shows.
#[derive(Debug, Clone, Serialize)]
pub struct PeopleView {
    pub table: TablePage,
    pub action_bar: ActionBarView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_menu: Option<ContextMenuView>,
}

/// The People page container.
pub struct PeoplePage<A> {
    api: Arc<A>,
    store: RecordStore,
    notices: NoticeBoard,
    dispatcher: MutationDispatcher<A>,
    table: EntityTable,
    action_bar: ActionBar,
    context_menu: ContextMenu,
}

impl<A: PeopleApi> PeoplePage<A> {
    /// Build the page over an existing store and notice board.
    #[must_use]
    pub fn new(api: Arc<A>, store: RecordStore, notices: NoticeBoard, page_size: usize) -> Self {
        Self {
            dispatcher: MutationDispatcher::new(Arc::clone(&api), store.clone(), notices.clone()),
            table: EntityTable::new(people_table_config(), store.clone(), page_size),
            action_bar: people_action_bar(),
            context_menu: ContextMenu::new(),
            api,
            store,
            notices,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    #[must_use]
    pub const fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    #[must_use]
    pub const fn table(&self) -> &EntityTable {
        &self.table
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the list and merge it into the store.
    ///
    /// Uses the server-side ordering of the active sort column when the API
    /// supports it.
    ///
    /// # Errors
    ///
    /// Returns the API error; the store is left as it was.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<usize, PageError> {
        let sort = self.table.sort().and_then(|s| {
            self.table
                .sort_column()
                .and_then(|c| c.server_sort_key())
                .map(|key| (key, s.direction))
        });
        let people = self
            .api
            .list_people(PeopleListParams {
                sort,
                ..PeopleListParams::default()
            })
            .await?;
        let count = self.store.load(people);
        info!(count, "People loaded");
        Ok(count)
    }

    /// A person by id, from the store or refetched on a miss.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::NotFound` if the server does not know the id.
    #[instrument(skip(self), fields(person_id = %id))]
    pub async fn open_person(&self, id: &PersonId) -> Result<Person, PageError> {
        if let Some(person) = self.store.get(id) {
            return Ok(person);
        }
        debug!("Store miss, refetching person");
        let person = self.api.get_person(id).await?;
        self.store.upsert_confirmed(person.clone());
        Ok(person)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Add a person with empty names.
    ///
    /// The placeholder row is in the store when this returns; the creation
    /// request runs in the background.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the generated id collides.
    #[instrument(skip(self))]
    pub fn add_person(&self) -> Result<MutationTicket, PageError> {
        let id = PersonId::generate();
        self.store.insert_optimistic(Person::placeholder(id.clone()))?;
        info!(person_id = %id, "Placeholder inserted");
        Ok(self
            .dispatcher
            .dispatch(Mutation::CreatePerson(PersonDraft::empty(id))))
    }

    /// The row for `id`, wherever it sits in the table.
    #[must_use]
    pub fn row(&self, id: &PersonId) -> Option<TableRow> {
        self.table.row(id)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Enter edit mode on a cell.
    ///
    /// # Errors
    ///
    /// Returns a table error for unknown rows or fields, read-only fields,
    /// and records still being created.
    pub fn begin_edit(&self, id: &PersonId, field: PersonField) -> Result<CellMode, PageError> {
        Ok(self.table.begin_edit(id, field)?)
    }

    /// Replace the draft of the cell being edited.
    ///
    /// # Errors
    ///
    /// Returns an error if no cell is being edited.
    pub fn set_draft(&self, value: impl Into<String>) -> Result<(), PageError> {
        Ok(self.table.set_draft(value)?)
    }

    /// Leave edit mode without touching the store.
    pub fn cancel_edit(&self) {
        self.table.cancel_edit();
    }

    /// Commit the cell being edited.
    ///
    /// Returns `None` for an unchanged draft. Otherwise the field is
    /// patched in the store and the update request dispatched.
    ///
    /// # Errors
    ///
    /// Returns a validation error (the cell stays in edit mode) or a store
    /// error if the record vanished.
    #[instrument(skip(self))]
    pub fn commit_edit(&self) -> Result<Option<MutationTicket>, PageError> {
        let Some((id, patch)) = self.table.commit_edit()? else {
            return Ok(None);
        };
        let ticket = self.store.apply_patch(&id, patch.clone())?;
        debug!(person_id = %id, field = %patch.field, %ticket, "Field patched");
        Ok(Some(self.dispatcher.dispatch(Mutation::UpdatePersonField {
            id,
            ticket,
            patch,
        })))
    }

    /// Edit one field in a single step: activate, set the draft, commit.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_edit`] and [`Self::commit_edit`]. A draft that fails
    /// validation is cancelled.
    pub fn edit_field(
        &self,
        id: &PersonId,
        field: PersonField,
        value: impl Into<String>,
    ) -> Result<Option<MutationTicket>, PageError> {
        self.begin_edit(id, field)?;
        self.set_draft(value)?;
        let result = self.commit_edit();
        if result.is_err() {
            self.cancel_edit();
        }
        result
    }

    // =========================================================================
    // Selection and actions
    // =========================================================================

    /// Sort the table.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown or unsortable columns.
    pub fn set_sort(&self, column: &str, direction: SortDirection) -> Result<(), PageError> {
        Ok(self.table.set_sort(column, direction)?)
    }

    pub fn set_page(&self, page: usize) {
        self.table.set_page(page);
    }

    /// Replace the selection; returns how many ids were kept.
    pub fn set_selection(&self, ids: &[PersonId]) -> usize {
        self.table.set_selection(ids)
    }

    /// Flip selection of one row.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown rows.
    pub fn toggle_selection(&self, id: &PersonId) -> Result<bool, PageError> {
        Ok(self.table.toggle(id)?)
    }

    /// Run an action-bar command on the current selection.
    ///
    /// Closes the context menu.
    ///
    /// # Errors
    ///
    /// Returns an `ActionError` for unknown keys, empty selections, and
    /// unconfirmed danger actions. Deleting is refused while a selected
    /// row is still being created or has unsaved edits.
    #[instrument(skip(self))]
    pub fn run_action(&self, key: &str, confirmed: bool) -> Result<ActionOutcome, PageError> {
        let selected = self.table.selected_ids();
        let handler = self.action_bar.resolve(key, selected.len(), confirmed)?;
        self.context_menu.close();

        match handler {
            ActionHandler::ClearSelection => {
                self.table.clear_selection();
                Ok(ActionOutcome::SelectionCleared)
            }
            ActionHandler::DeleteSelected => {
                let removed = self.store.remove_many(&selected)?;
                self.table.clear_selection();
                info!(count = removed.len(), "Rows removed pending delete");
                Ok(ActionOutcome::Deleting(
                    self.dispatcher.dispatch(Mutation::DeletePeople { removed }),
                ))
            }
        }
    }

    /// Open the context menu on a row.
    ///
    /// A row that is not selected becomes the only selected row.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown rows.
    pub fn open_context_menu(
        &self,
        id: &PersonId,
        position: MenuPosition,
    ) -> Result<Option<ContextMenuView>, PageError> {
        if !self.table.is_selected(id) {
            self.table.select_only(id)?;
        }
        self.context_menu.open(id.clone(), position);
        Ok(self.context_menu.render(self.action_bar.entries()))
    }

    pub fn close_context_menu(&self) {
        self.context_menu.close();
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render the page from the current store contents.
    #[must_use]
    pub fn render(&self) -> PeopleView {
        let table = self.table.render();
        PeopleView {
            action_bar: self.action_bar.render(table.selected_count),
            context_menu: self.context_menu.render(self.action_bar.entries()),
            table,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use orbit_core::RecordState;

    use super::*;
    use crate::crm::FieldPatch;

    /// API whose writes never resolve, to observe optimistic state.
    struct StalledApi;

    impl PeopleApi for StalledApi {
        async fn get_person(&self, id: &PersonId) -> Result<Person, CrmError> {
            let mut p = Person::placeholder(id.clone());
            p.first_name = "Fetched".into();
            Ok(p)
        }

        async fn list_people(&self, _params: PeopleListParams) -> Result<Vec<Person>, CrmError> {
            Ok(vec![Person::placeholder(PersonId::new("a"))])
        }

        async fn create_person(&self, _draft: PersonDraft) -> Result<Person, CrmError> {
            std::future::pending().await
        }

        async fn update_person_field(
            &self,
            _id: &PersonId,
            _patch: FieldPatch,
        ) -> Result<Person, CrmError> {
            std::future::pending().await
        }

        async fn delete_people(&self, _ids: Vec<PersonId>) -> Result<u64, CrmError> {
            std::future::pending().await
        }
    }

    fn page() -> PeoplePage<StalledApi> {
        PeoplePage::new(
            Arc::new(StalledApi),
            RecordStore::new(),
            NoticeBoard::default(),
            25,
        )
    }

    #[tokio::test]
    async fn test_add_person_is_visible_before_response() {
        let page = page();
        page.load().await.unwrap();
        let ticket = page.add_person().unwrap();
        let id = ticket.ids()[0].clone();

        let view = page.render();
        assert_eq!(view.table.rows[0].id, id);
        assert_eq!(view.table.rows[0].state, RecordState::Pending);
        assert_eq!(view.table.total_rows, 2);
    }

    #[tokio::test]
    async fn test_open_person_refetches_on_miss() {
        let page = page();
        let id = PersonId::new("remote");
        assert!(!page.store().contains(&id));
        let person = page.open_person(&id).await.unwrap();
        assert_eq!(person.first_name, "Fetched");
        assert!(page.store().contains(&id));
    }

    #[tokio::test]
    async fn test_context_menu_selects_row() {
        let page = page();
        page.load().await.unwrap();
        let id = PersonId::new("a");
        let view = page
            .open_context_menu(&id, MenuPosition { x: 1, y: 2 })
            .unwrap()
            .unwrap();
        assert_eq!(view.row, id);
        assert!(page.table().is_selected(&id));
        assert!(page.render().action_bar.visible);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation_then_removes() {
        let page = page();
        page.load().await.unwrap();
        page.set_selection(&[PersonId::new("a")]);

        assert!(matches!(
            page.run_action("delete", false),
            Err(PageError::Action(ActionError::ConfirmationRequired(_)))
        ));
        assert_eq!(page.store().len(), 1);

        let outcome = page.run_action("delete", true).unwrap();
        assert!(matches!(outcome, ActionOutcome::Deleting(_)));
        assert!(page.store().is_empty());
        assert!(!page.render().action_bar.visible);
    }

    #[tokio::test]
    async fn test_edit_on_placeholder_refused() {
        let page = page();
        let ticket = page.add_person().unwrap();
        let id = ticket.ids()[0].clone();
        assert!(matches!(
            page.begin_edit(&id, PersonField::City),
            Err(PageError::Table(TableError::Cell(_)))
        ));
    }

    #[tokio::test]
    async fn test_invalid_edit_is_cancelled_without_store_change() {
        let page = page();
        page.load().await.unwrap();
        let id = PersonId::new("a");
        let before = page.store().entry(&id);

        assert!(page.edit_field(&id, PersonField::Email, "nope").is_err());
        assert!(page.table().editing().is_none());
        assert_eq!(page.store().entry(&id), before);
    }
}
