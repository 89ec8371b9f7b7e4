//! People page route handlers.
//!
//! Mutating endpoints answer as soon as the optimistic store change is in
//! place (`202 Accepted`); the server round-trip finishes in the background
//! and failures surface through `GET /notices`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use orbit_core::PersonId;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::components::MenuPosition;
use crate::components::TableRow;
use crate::crm::{PeopleApi, Person, PersonField, SortDirection};
use crate::error::{AppError, Result};
use crate::notices::Notice;
use crate::pages::{ActionOutcome, PeopleView};
use crate::state::AppState;

/// Query parameters for the table view.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<usize>,
}

/// Render the current page of the table.
#[instrument(skip(state))]
pub async fn index<A: PeopleApi>(
    State(state): State<AppState<A>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PeopleView>> {
    let people = state.people();
    if let Some(column) = query.sort.as_deref() {
        let direction = match query.dir.as_deref() {
            Some(dir) => SortDirection::from_str_param(dir)
                .ok_or_else(|| AppError::BadRequest(format!("invalid sort direction: {dir}")))?,
            None => SortDirection::default(),
        };
        people.set_sort(column, direction)?;
    }
    if let Some(page) = query.page {
        people.set_page(page);
    }
    Ok(Json(people.render()))
}

/// Response for a reload.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub loaded: usize,
}

/// Reload the list from the CRM.
#[instrument(skip(state))]
pub async fn refresh<A: PeopleApi>(
    State(state): State<AppState<A>>,
) -> Result<Json<RefreshResponse>> {
    let loaded = state.people().load().await?;
    Ok(Json(RefreshResponse { loaded }))
}

/// Add a person. Responds with the placeholder row.
#[instrument(skip(state))]
pub async fn create<A: PeopleApi>(
    State(state): State<AppState<A>>,
) -> Result<(StatusCode, Json<TableRow>)> {
    let people = state.people();
    let ticket = people.add_person()?;
    let row = ticket
        .ids()
        .first()
        .and_then(|id| people.row(id))
        .ok_or_else(|| AppError::Internal("placeholder vanished before render".to_string()))?;
    Ok((StatusCode::ACCEPTED, Json(row)))
}

/// Get one person, refetching on a store miss.
#[instrument(skip(state))]
pub async fn show<A: PeopleApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<String>,
) -> Result<Json<Person>> {
    let person = state.people().open_person(&PersonId::new(id)).await?;
    Ok(Json(person))
}

/// Request body for a cell edit.
#[derive(Debug, Deserialize)]
pub struct EditFieldRequest {
    pub value: String,
}

/// Commit a cell edit.
///
/// Responds `202` with the optimistically patched row, or `200` when the
/// value was unchanged.
#[instrument(skip(state, body))]
pub async fn update_field<A: PeopleApi>(
    State(state): State<AppState<A>>,
    Path((id, field)): Path<(String, String)>,
    Json(body): Json<EditFieldRequest>,
) -> Result<(StatusCode, Json<TableRow>)> {
    let field = PersonField::from_str_param(&field)
        .ok_or_else(|| AppError::BadRequest(format!("unknown field: {field}")))?;
    let id = PersonId::new(id);
    let people = state.people();

    let ticket = people.edit_field(&id, field, body.value)?;
    let row = people
        .row(&id)
        .ok_or_else(|| AppError::NotFound(id.to_string()))?;
    let status = if ticket.is_some() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(row)))
}

/// Request body for replacing the selection.
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub ids: Vec<PersonId>,
}

/// Response for a selection change.
#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionResponse {
    pub selected: usize,
}

/// Replace the selection.
pub async fn select<A: PeopleApi>(
    State(state): State<AppState<A>>,
    Json(body): Json<SelectionRequest>,
) -> Json<SelectionResponse> {
    let selected = state.people().set_selection(&body.ids);
    Json(SelectionResponse { selected })
}

/// Request body for running an action.
#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub confirmed: bool,
}

/// Response for an action run.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub action: String,
    /// Rows affected locally.
    pub affected: usize,
}

/// Run an action-bar command on the selection.
#[instrument(skip(state, body))]
pub async fn run_action<A: PeopleApi>(
    State(state): State<AppState<A>>,
    Path(key): Path<String>,
    Json(body): Json<ActionRequest>,
) -> Result<(StatusCode, Json<ActionResponse>)> {
    let outcome = state.people().run_action(&key, body.confirmed)?;
    let (status, affected) = match outcome {
        ActionOutcome::Deleting(ticket) => (StatusCode::ACCEPTED, ticket.ids().len()),
        ActionOutcome::SelectionCleared => (StatusCode::OK, 0),
    };
    Ok((
        status,
        Json(ActionResponse {
            action: key,
            affected,
        }),
    ))
}

/// Open the context menu on a row.
pub async fn context_menu<A: PeopleApi>(
    State(state): State<AppState<A>>,
    Path(id): Path<String>,
    Json(position): Json<MenuPosition>,
) -> Result<Json<PeopleView>> {
    let people = state.people();
    people.open_context_menu(&PersonId::new(id), position)?;
    Ok(Json(people.render()))
}

/// Drain user-visible notices.
pub async fn notices<A: PeopleApi>(State(state): State<AppState<A>>) -> Json<Vec<Notice>> {
    Json(state.notices().drain())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use super::*;
    use crate::crm::{CrmError, FieldPatch, PeopleListParams, PersonDraft};
    use crate::routes::routes;

    struct EchoApi;

    impl PeopleApi for EchoApi {
        async fn get_person(&self, id: &PersonId) -> std::result::Result<Person, CrmError> {
            Err(CrmError::NotFound(id.to_string()))
        }

        async fn list_people(
            &self,
            _params: PeopleListParams,
        ) -> std::result::Result<Vec<Person>, CrmError> {
            let mut ada = Person::placeholder(PersonId::new("ada"));
            ada.first_name = "Ada".into();
            let mut bob = Person::placeholder(PersonId::new("bob"));
            bob.first_name = "Bob".into();
            Ok(vec![ada, bob])
        }

        async fn create_person(&self, draft: PersonDraft) -> std::result::Result<Person, CrmError> {
            Ok(Person::placeholder(draft.id))
        }

        async fn update_person_field(
            &self,
            id: &PersonId,
            patch: FieldPatch,
        ) -> std::result::Result<Person, CrmError> {
            let mut person = Person::placeholder(id.clone());
            person.set(patch.field, patch.value);
            Ok(person)
        }

        async fn delete_people(&self, ids: Vec<PersonId>) -> std::result::Result<u64, CrmError> {
            Ok(ids.len() as u64)
        }
    }

    fn app() -> (Router, AppState<EchoApi>) {
        let state = AppState::new(EchoApi, 10);
        (routes().with_state(state.clone()), state)
    }

    fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_then_list_sorted() {
        let (app, _) = app();
        let response = app
            .clone()
            .oneshot(Request::post("/people/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["loaded"], 2);

        let response = app
            .oneshot(
                Request::get("/people?sort=name&dir=desc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["table"]["rows"][0]["id"], "bob");
        assert_eq!(body["table"]["total_rows"], 2);
    }

    #[tokio::test]
    async fn test_bad_sort_direction() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/people?sort=name&dir=up").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_returns_placeholder_row() {
        let (app, state) = app();
        let response = app
            .oneshot(Request::post("/people").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_json(response).await;
        assert_eq!(body["record"]["first_name"], "");
        let id = PersonId::new(body["id"].as_str().unwrap());
        assert!(state.people().store().contains(&id));
    }

    #[tokio::test]
    async fn test_update_field_validation_error() {
        let (app, state) = app();
        state.people().load().await.unwrap();
        let response = app
            .oneshot(json_request(
                "PUT",
                "/people/ada/fields/email",
                &serde_json::json!({ "value": "not an email" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_update_field_accepted() {
        let (app, state) = app();
        state.people().load().await.unwrap();
        let response = app
            .oneshot(json_request(
                "PUT",
                "/people/ada/fields/city",
                &serde_json::json!({ "value": "Paris" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["record"]["city"], "Paris");
    }

    #[tokio::test]
    async fn test_unknown_field() {
        let (app, state) = app();
        state.people().load().await.unwrap();
        let response = app
            .oneshot(json_request(
                "PUT",
                "/people/ada/fields/shoe_size",
                &serde_json::json!({ "value": "42" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let (app, state) = app();
        state.people().load().await.unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/people/selection",
                &serde_json::json!({ "ids": ["ada", "ghost"] }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["selected"], 1);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/people/actions/delete",
                &serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PRECONDITION_REQUIRED);

        let response = app
            .oneshot(json_request(
                "POST",
                "/people/actions/delete",
                &serde_json::json!({ "confirmed": true }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["affected"], 1);
        assert!(!state.people().store().contains(&PersonId::new("ada")));
    }

    #[tokio::test]
    async fn test_show_missing_person() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::get("/people/nobody").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notices_drain() {
        let (app, state) = app();
        state.notices().error("Could not create person", None);
        let response = app
            .oneshot(Request::get("/notices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body[0]["message"], "Could not create person");
        assert_eq!(body[0]["level"], "error");
        assert_eq!(state.notices().pending(), 0);
    }
}
