//! Application state shared across handlers.

use std::sync::Arc;

use crate::crm::PeopleApi;
use crate::notices::NoticeBoard;
use crate::pages::PeoplePage;
use crate::store::RecordStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It is generic over the CRM
/// API so routes can be exercised against an in-memory backend.
pub struct AppState<A> {
    inner: Arc<AppStateInner<A>>,
}

struct AppStateInner<A> {
    people: PeoplePage<A>,
}

// Manual impl: `A` itself need not be `Clone`.
impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: PeopleApi> AppState<A> {
    /// Create a new application state with an empty store.
    #[must_use]
    pub fn new(api: A, page_size: usize) -> Self {
        let people = PeoplePage::new(
            Arc::new(api),
            RecordStore::new(),
            NoticeBoard::default(),
            page_size,
        );
        Self {
            inner: Arc::new(AppStateInner { people }),
        }
    }

    /// Get a reference to the People page.
    #[must_use]
    pub fn people(&self) -> &PeoplePage<A> {
        &self.inner.people
    }

    /// Get a reference to the notice board.
    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        self.inner.people.notices()
    }
}
