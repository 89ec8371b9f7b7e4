//! HTTP route handlers for the front.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Health check
//!
//! # People
//! GET  /people?sort=&dir=&page=        - Current table page
//! POST /people                         - Add a person (202, placeholder row)
//! POST /people/refresh                 - Reload from the CRM
//! GET  /people/{id}                    - One person (refetched on miss)
//! PUT  /people/{id}/fields/{field}     - Commit a cell edit
//! POST /people/{id}/context-menu       - Open the row context menu
//! POST /people/selection               - Replace the selection
//! POST /people/actions/{key}           - Run an action-bar command
//!
//! # Notices
//! GET  /notices                        - Drain user-visible notices
//! ```

pub mod people;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::crm::PeopleApi;
use crate::state::AppState;

/// Create the people routes router.
pub fn people_routes<A: PeopleApi>() -> Router<AppState<A>> {
    Router::new()
        .route("/", get(people::index::<A>).post(people::create::<A>))
        .route("/refresh", post(people::refresh::<A>))
        .route("/selection", post(people::select::<A>))
        .route("/actions/{key}", post(people::run_action::<A>))
        .route("/{id}", get(people::show::<A>))
        .route("/{id}/fields/{field}", put(people::update_field::<A>))
        .route("/{id}/context-menu", post(people::context_menu::<A>))
}

/// Create all routes for the front.
pub fn routes<A: PeopleApi>() -> Router<AppState<A>> {
    Router::new()
        .route("/health", get(health))
        .route("/notices", get(people::notices::<A>))
        .nest("/people", people_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
