//! Integration tests for the People page optimistic flows.
//!
//! These drive `PeoplePage` against the in-memory CRM and check the store
//! and table after each server outcome.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use orbit_core::{PersonId, RecordState};
use orbit_front::commands::{MutationError, MutationOutput};
use orbit_front::crm::{CrmError, PersonField};
use orbit_front::notices::{NoticeBoard, NoticeLevel};
use orbit_front::pages::{ActionOutcome, PageError, PeoplePage};
use orbit_front::store::{RecordStore, StoreError, StoreEvent};
use orbit_integration_tests::{InMemoryCrm, Op, seed};

async fn loaded_page() -> (PeoplePage<InMemoryCrm>, Arc<InMemoryCrm>) {
    let api = Arc::new(InMemoryCrm::new(seed()));
    let page = PeoplePage::new(
        Arc::clone(&api),
        RecordStore::new(),
        NoticeBoard::default(),
        50,
    );
    page.load().await.unwrap();
    (page, api)
}

fn ids(page: &PeoplePage<InMemoryCrm>) -> Vec<String> {
    page.render()
        .table
        .rows
        .into_iter()
        .map(|r| r.id.into_inner())
        .collect()
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test]
async fn test_placeholder_row_visible_immediately() {
    let (page, api) = loaded_page().await;
    api.hold(Op::Create);

    let ticket = page.add_person().unwrap();
    let id = ticket.ids()[0].clone();

    let rows = page.render().table.rows;
    let matching: Vec<_> = rows.iter().filter(|r| r.id == id).collect();
    assert_eq!(matching.len(), 1);
    let row = matching[0];
    assert_eq!(row.state, RecordState::Pending);
    assert!(row.record.first_name.is_empty());
    assert!(row.record.last_name.is_empty());
    assert!(row.record.display_name.is_empty());
    assert!(row.record.created_at.is_none());
    assert_eq!(rows[0].id, id);

    api.release(Op::Create);
    ticket.outcome().await.unwrap();
}

#[tokio::test]
async fn test_successful_creation_is_not_duplicated() {
    let (page, api) = loaded_page().await;

    let ticket = page.add_person().unwrap();
    let id = ticket.ids()[0].clone();
    let output = ticket.outcome().await.unwrap();

    let MutationOutput::Created(server) = output else {
        panic!("expected a creation result");
    };
    assert_eq!(page.store().len(), 4);
    assert_eq!(ids(&page).iter().filter(|i| **i == id.as_str()).count(), 1);
    assert_eq!(page.store().get(&id).unwrap(), server);
    assert_eq!(page.store().state(&id), Some(RecordState::Confirmed));
    assert_eq!(api.server_person(&id), Some(server));

    // A later reload merges the same id instead of appending it again.
    page.load().await.unwrap();
    assert_eq!(page.store().len(), 4);
}

#[tokio::test]
async fn test_failed_creation_removes_only_that_row() {
    let (page, api) = loaded_page().await;
    let before: Vec<_> = page.store().snapshot();
    api.fail(Op::Create);

    let ticket = page.add_person().unwrap();
    let id = ticket.ids()[0].clone();
    let result = ticket.outcome().await;

    assert!(matches!(result, Err(MutationError::Crm(CrmError::Transport(_)))));
    assert!(!page.store().contains(&id));
    assert_eq!(page.store().snapshot(), before);

    let notices = page.notices().drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].person_id, Some(id));
}

#[tokio::test]
async fn test_concurrent_creations_reconcile_independently() {
    let (page, api) = loaded_page().await;
    api.hold(Op::Create);

    let first = page.add_person().unwrap();
    let second = page.add_person().unwrap();
    let first_id = first.ids()[0].clone();
    let second_id = second.ids()[0].clone();
    assert_ne!(first_id, second_id);
    assert_eq!(page.store().len(), 5);

    api.fail_id(&second_id);
    api.release(Op::Create);

    assert!(first.outcome().await.is_ok());
    assert!(second.outcome().await.is_err());

    assert_eq!(page.store().state(&first_id), Some(RecordState::Confirmed));
    assert!(!page.store().contains(&second_id));
    assert_eq!(page.store().len(), 4);
}

#[tokio::test]
async fn test_foreign_server_id_rolls_back() {
    let (page, api) = loaded_page().await;
    api.echo_foreign_ids();

    let ticket = page.add_person().unwrap();
    let id = ticket.ids()[0].clone();
    let result = ticket.outcome().await;

    assert!(matches!(
        result,
        Err(MutationError::Crm(CrmError::ReconciliationConflict { .. }))
    ));
    assert!(!page.store().contains(&id));
    assert_eq!(page.notices().pending(), 1);
}

#[tokio::test]
async fn test_creation_emits_store_events() {
    let (page, _api) = loaded_page().await;
    let mut events = page.store().subscribe();

    let ticket = page.add_person().unwrap();
    let id = ticket.ids()[0].clone();
    ticket.outcome().await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::Inserted {
            id: id.clone(),
            state: RecordState::Pending
        }
    );
    assert_eq!(events.recv().await.unwrap(), StoreEvent::Reconciled { id });
}

// =============================================================================
// Editing
// =============================================================================

#[tokio::test]
async fn test_edit_changes_only_that_field() {
    let (page, _api) = loaded_page().await;
    let id = PersonId::new("ada");
    let before = page.store().get(&id).unwrap();

    let ticket = page
        .edit_field(&id, PersonField::JobTitle, "Mathematician")
        .unwrap()
        .unwrap();
    assert_eq!(
        page.store().get(&id).unwrap().job_title.as_deref(),
        Some("Mathematician")
    );
    assert_eq!(page.store().state(&id), Some(RecordState::Pending));

    ticket.outcome().await.unwrap();

    let mut expected = before;
    expected.job_title = Some("Mathematician".to_string());
    assert_eq!(page.store().get(&id).unwrap(), expected);
    assert_eq!(page.store().state(&id), Some(RecordState::Confirmed));
}

#[tokio::test]
async fn test_cancel_edit_leaves_store_unchanged() {
    let (page, api) = loaded_page().await;
    let id = PersonId::new("grace");
    let before = page.store().entry(&id).unwrap();

    page.begin_edit(&id, PersonField::City).unwrap();
    page.set_draft("Arlington").unwrap();
    page.cancel_edit();

    assert_eq!(page.store().entry(&id).unwrap(), before);
    assert!(page.table().editing().is_none());
    assert_eq!(api.calls(Op::Update), 0);
}

#[tokio::test]
async fn test_unchanged_commit_sends_nothing() {
    let (page, api) = loaded_page().await;
    let id = PersonId::new("grace");

    page.begin_edit(&id, PersonField::City).unwrap();
    assert!(page.commit_edit().unwrap().is_none());
    assert_eq!(api.calls(Op::Update), 0);
}

#[tokio::test]
async fn test_failed_edit_reverts_to_last_confirmed() {
    let (page, api) = loaded_page().await;
    let id = PersonId::new("ada");
    let before = page.store().entry(&id).unwrap();
    api.fail(Op::Update);

    let ticket = page
        .edit_field(&id, PersonField::City, "Paris")
        .unwrap()
        .unwrap();
    assert!(ticket.outcome().await.is_err());

    let after = page.store().entry(&id).unwrap();
    assert_eq!(after.current().city.as_deref(), Some("London"));
    assert_eq!(after, before);
    assert_eq!(after.state(), RecordState::Confirmed);
    assert_eq!(page.notices().pending(), 1);
}

#[tokio::test]
async fn test_concurrent_edits_fail_independently() {
    let (page, api) = loaded_page().await;
    let id = PersonId::new("ada");
    api.hold(Op::Update);

    let city = page
        .edit_field(&id, PersonField::City, "Paris")
        .unwrap()
        .unwrap();
    let title = page
        .edit_field(&id, PersonField::JobTitle, "Analyst")
        .unwrap()
        .unwrap();
    assert_eq!(page.store().entry(&id).unwrap().pending_patches(), 2);

    api.fail_id(&id);
    api.release(Op::Update);
    assert!(city.outcome().await.is_err());
    assert!(title.outcome().await.is_err());

    let current = page.store().get(&id).unwrap();
    assert_eq!(current.city.as_deref(), Some("London"));
    assert_eq!(current.job_title, None);
    assert_eq!(page.store().state(&id), Some(RecordState::Confirmed));
}

#[tokio::test]
async fn test_load_keeps_pending_edit_on_top() {
    let (page, api) = loaded_page().await;
    let id = PersonId::new("ada");
    api.hold(Op::Update);

    let ticket = page
        .edit_field(&id, PersonField::City, "Paris")
        .unwrap()
        .unwrap();
    page.load().await.unwrap();

    let entry = page.store().entry(&id).unwrap();
    assert_eq!(entry.current().city.as_deref(), Some("Paris"));
    assert_eq!(entry.last_confirmed().unwrap().city.as_deref(), Some("London"));
    assert_eq!(entry.pending_patches(), 1);
    assert_eq!(entry.state(), RecordState::Pending);

    api.release(Op::Update);
    ticket.outcome().await.unwrap();
    page.load().await.unwrap();

    let entry = page.store().entry(&id).unwrap();
    assert_eq!(entry.current().city.as_deref(), Some("Paris"));
    assert_eq!(entry.pending_patches(), 0);
    assert_eq!(entry.state(), RecordState::Confirmed);
}

#[tokio::test]
async fn test_delete_refused_while_edit_pending() {
    let (page, api) = loaded_page().await;
    let id = PersonId::new("ada");
    api.hold(Op::Update);

    let edit = page
        .edit_field(&id, PersonField::City, "Paris")
        .unwrap()
        .unwrap();
    page.set_selection(std::slice::from_ref(&id));

    let result = page.run_action("delete", true);
    assert!(matches!(
        result,
        Err(PageError::Store(StoreError::PatchesPending(ref pending))) if *pending == id
    ));
    assert!(page.store().contains(&id));
    assert_eq!(api.calls(Op::Delete), 0);

    api.release(Op::Update);
    edit.outcome().await.unwrap();
    assert_eq!(page.store().state(&id), Some(RecordState::Confirmed));

    let ActionOutcome::Deleting(delete) = page.run_action("delete", true).unwrap() else {
        panic!("expected a delete");
    };
    assert_eq!(delete.outcome().await.unwrap(), MutationOutput::Deleted(1));
    assert!(api.server_person(&id).is_none());
}

#[tokio::test]
async fn test_delete_refused_while_creation_pending() {
    let (page, api) = loaded_page().await;
    api.hold(Op::Create);

    let create = page.add_person().unwrap();
    let id = create.ids()[0].clone();
    page.set_selection(std::slice::from_ref(&id));

    let result = page.run_action("delete", true);
    assert!(matches!(
        result,
        Err(PageError::Store(StoreError::CreationPending(ref pending))) if *pending == id
    ));
    assert!(page.store().contains(&id));
    assert_eq!(api.calls(Op::Delete), 0);

    api.release(Op::Create);
    create.outcome().await.unwrap();

    let ActionOutcome::Deleting(delete) = page.run_action("delete", true).unwrap() else {
        panic!("expected a delete");
    };
    assert_eq!(delete.outcome().await.unwrap(), MutationOutput::Deleted(1));
    assert!(api.server_person(&id).is_none());

    page.load().await.unwrap();
    assert!(!page.store().contains(&id));
    assert_eq!(page.notices().pending(), 0);
}

#[tokio::test]
async fn test_edit_refused_while_creation_pending() {
    let (page, api) = loaded_page().await;
    api.hold(Op::Create);
    let ticket = page.add_person().unwrap();
    let id = ticket.ids()[0].clone();

    assert!(page.begin_edit(&id, PersonField::FirstName).is_err());

    api.release(Op::Create);
    ticket.outcome().await.unwrap();
    assert!(page.begin_edit(&id, PersonField::FirstName).is_ok());
}

// =============================================================================
// Deleting
// =============================================================================

#[tokio::test]
async fn test_delete_removes_selected_rows() {
    let (page, api) = loaded_page().await;
    page.set_selection(&[PersonId::new("ada"), PersonId::new("linus")]);

    let ActionOutcome::Deleting(ticket) = page.run_action("delete", true).unwrap() else {
        panic!("expected a delete");
    };
    assert_eq!(ids(&page), vec!["grace"]);

    assert_eq!(ticket.outcome().await.unwrap(), MutationOutput::Deleted(2));
    assert_eq!(api.server_len(), 1);
}

#[tokio::test]
async fn test_failed_delete_restores_original_positions() {
    let (page, api) = loaded_page().await;
    api.fail(Op::Delete);
    page.set_selection(&[PersonId::new("ada"), PersonId::new("linus")]);

    let ActionOutcome::Deleting(ticket) = page.run_action("delete", true).unwrap() else {
        panic!("expected a delete");
    };
    assert!(ticket.outcome().await.is_err());

    assert_eq!(ids(&page), vec!["ada", "grace", "linus"]);
    assert_eq!(page.notices().pending(), 1);
}

#[tokio::test]
async fn test_clear_selection_action() {
    let (page, _api) = loaded_page().await;
    page.set_selection(&[PersonId::new("ada")]);
    assert!(page.render().action_bar.visible);

    let outcome = page.run_action("deselect", false).unwrap();
    assert!(matches!(outcome, ActionOutcome::SelectionCleared));
    assert!(!page.render().action_bar.visible);
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_open_person_refetches_missing_record() {
    let api = Arc::new(InMemoryCrm::new(seed()));
    let page = PeoplePage::new(
        Arc::clone(&api),
        RecordStore::new(),
        NoticeBoard::default(),
        50,
    );

    let person = page.open_person(&PersonId::new("grace")).await.unwrap();
    assert_eq!(person.first_name, "Grace");
    assert_eq!(api.calls(Op::Get), 1);

    page.open_person(&PersonId::new("grace")).await.unwrap();
    assert_eq!(api.calls(Op::Get), 1);
}

#[tokio::test]
async fn test_failed_load_keeps_store() {
    let (page, api) = loaded_page().await;
    api.fail(Op::List);
    assert!(page.load().await.is_err());
    assert_eq!(page.store().len(), 3);
}

#[tokio::test]
async fn test_sorted_load_uses_server_order() {
    let api = Arc::new(InMemoryCrm::new(seed()));
    let page = PeoplePage::new(
        Arc::clone(&api),
        RecordStore::new(),
        NoticeBoard::default(),
        2,
    );
    page.set_sort("last_name", orbit_front::crm::SortDirection::Desc)
        .unwrap();
    page.load().await.unwrap();

    let view = page.render();
    assert_eq!(view.table.total_pages, 2);
    let first: Vec<_> = view.table.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(first, vec!["linus", "ada"]);
}
