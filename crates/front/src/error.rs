//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::components::{ActionError, CellError, TableError};
use crate::crm::CrmError;
use crate::pages::PageError;
use crate::store::StoreError;

/// Application-level error type for the front.
#[derive(Debug, Error)]
pub enum AppError {
    /// CRM API operation failed.
    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    /// Record store rejected the operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Table or cell interaction failed.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Action bar command could not run.
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Crm(e) => Self::Crm(e),
            PageError::Store(e) => Self::Store(e),
            PageError::Table(e) => Self::Table(e),
            PageError::Action(e) => Self::Action(e),
        }
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Crm(err) => match err {
                CrmError::NotFound(_) => StatusCode::NOT_FOUND,
                CrmError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Store(err) => match err {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::AlreadyExists(_)
                | StoreError::CreationPending(_)
                | StoreError::PatchesPending(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Table(err) => match err {
                TableError::RowNotFound(_) => StatusCode::NOT_FOUND,
                TableError::Cell(CellError::RecordPending(_)) => StatusCode::CONFLICT,
                TableError::Cell(CellError::Invalid { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Action(err) => match err {
                ActionError::UnknownAction(_) => StatusCode::NOT_FOUND,
                ActionError::EmptySelection => StatusCode::BAD_REQUEST,
                ActionError::ConfirmationRequired(_) => StatusCode::PRECONDITION_REQUIRED,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose upstream error details to clients
        let message = match &self {
            Self::Internal(_) | Self::Store(_) if status.is_server_error() => {
                "Internal server error".to_string()
            }
            Self::Crm(_) if status == StatusCode::BAD_GATEWAY => {
                "CRM service error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
