//! CRM GraphQL API access.
//!
//! # Architecture
//!
//! - Uses `graphql-client` crate for type-safe GraphQL operations
//! - The CRM server is the source of truth; the [`RecordStore`] holds the
//!   client-side copy
//! - In-memory caching of single-person reads via `moka` (TTL from config)
//! - [`PeopleApi`] is the seam the page depends on, so flows can be driven
//!   by an in-memory fake in tests
//!
//! [`RecordStore`]: crate::store::RecordStore
//!
//! # Example
//!
//! ```rust,ignore
//! use orbit_front::crm::{CrmClient, PeopleApi};
//!
//! let client = CrmClient::new(&config.crm);
//! let person = client.get_person(&id).await?;
//! ```

mod client;
mod conversions;
pub mod queries;
pub mod types;

use std::future::Future;

pub use client::CrmClient;
pub use types::*;

use orbit_core::PersonId;
use thiserror::Error;

/// Errors that can occur when talking to the CRM API.
#[derive(Debug, Error)]
pub enum CrmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL operation returned errors (server-side validation included).
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The server's answer does not match what was optimistically assumed.
    #[error("Reconciliation conflict for {expected}: server returned {actual}")]
    ReconciliationConflict {
        /// Id the client synthesized or targeted.
        expected: PersonId,
        /// Id the server echoed back.
        actual: PersonId,
    },

    /// Transport failure reported by a non-HTTP backend.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl CrmError {
    /// Convenience constructor for a single-message GraphQL error.
    #[must_use]
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::GraphQL(vec![GraphQLError {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }])
    }
}

/// A GraphQL error returned by the CRM API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL document where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Operations the People page needs from the CRM server.
///
/// Futures must be `Send` so flows can be spawned onto the runtime.
pub trait PeopleApi: Send + Sync + 'static {
    /// Fetch one person by id.
    fn get_person(
        &self,
        id: &PersonId,
    ) -> impl Future<Output = Result<Person, CrmError>> + Send;

    /// List people.
    fn list_people(
        &self,
        params: PeopleListParams,
    ) -> impl Future<Output = Result<Vec<Person>, CrmError>> + Send;

    /// Create a person with a client-generated id.
    fn create_person(
        &self,
        draft: PersonDraft,
    ) -> impl Future<Output = Result<Person, CrmError>> + Send;

    /// Update one field of one person.
    fn update_person_field(
        &self,
        id: &PersonId,
        patch: FieldPatch,
    ) -> impl Future<Output = Result<Person, CrmError>> + Send;

    /// Delete people by id; returns the number deleted.
    fn delete_people(
        &self,
        ids: Vec<PersonId>,
    ) -> impl Future<Output = Result<u64, CrmError>> + Send;
}
