//! CRM GraphQL API client implementation.
//!
//! Uses `graphql_client` for type-safe operations with `reqwest` for HTTP.
//! Single-person reads are cached with `moka`; writes invalidate the ids
//! they touch.

use std::sync::Arc;

use graphql_client::{GraphQLQuery, Response};
use moka::future::Cache;
use orbit_core::PersonId;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use crate::config::CrmConfig;

use super::conversions::{
    convert_created_person, convert_get_people_item, convert_get_person, convert_updated_person,
    field_patch_input, people_list_variables,
};
use super::queries::{
    CreateOnePerson, DeleteManyPerson, GetPeople, GetPerson, UpdateOnePerson, create_one_person,
    delete_many_person, get_person, update_one_person,
};
use super::types::{FieldPatch, PeopleListParams, Person, PersonDraft};
use super::{CrmError, GraphQLError, GraphQLErrorLocation, PeopleApi};

// =============================================================================
// CrmClient
// =============================================================================

/// Client for the CRM GraphQL API.
#[derive(Clone)]
pub struct CrmClient {
    inner: Arc<CrmClientInner>,
}

struct CrmClientInner {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    cache: Cache<PersonId, Person>,
}

impl CrmClient {
    /// Create a new CRM API client.
    #[must_use]
    pub fn new(config: &CrmConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(config.cache_ttl)
            .build();

        Self {
            inner: Arc::new(CrmClientInner {
                client: reqwest::Client::new(),
                endpoint: config.api_url.to_string(),
                api_token: config.api_token.expose_secret().to_string(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, CrmError>
    where
        Q::Variables: serde::Serialize,
    {
        let request_body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(&self.inner.api_token)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CrmError::RateLimited(retry_after));
        }

        // Read as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "CRM API returned non-success status"
            );
            return Err(CrmError::graphql(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse CRM GraphQL response"
                );
                return Err(CrmError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");

            return Err(CrmError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        locations: e.locations.map_or_else(Vec::new, |locs| {
                            locs.into_iter()
                                .map(|l| GraphQLErrorLocation {
                                    line: i64::from(l.line),
                                    column: i64::from(l.column),
                                })
                                .collect()
                        }),
                        path: e.path.map_or_else(Vec::new, |p| {
                            p.into_iter()
                                .map(|fragment| match fragment {
                                    graphql_client::PathFragment::Key(s) => {
                                        serde_json::Value::String(s)
                                    }
                                    graphql_client::PathFragment::Index(i) => {
                                        serde_json::Value::Number(i.into())
                                    }
                                })
                                .collect()
                        }),
                    })
                    .collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!("CRM GraphQL response has no data and no errors");
            CrmError::graphql("No data in response")
        })
    }

    /// Drop cached reads for the given ids.
    async fn invalidate(&self, ids: &[PersonId]) {
        for id in ids {
            self.inner.cache.invalidate(id).await;
        }
    }

    /// Get a person by id, served from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the person is not found or the API request fails.
    #[instrument(skip(self), fields(person_id = %id))]
    pub async fn fetch_person(&self, id: &PersonId) -> Result<Person, CrmError> {
        if let Some(person) = self.inner.cache.get(id).await {
            debug!("Cache hit for person");
            return Ok(person);
        }

        let variables = get_person::Variables {
            id: id.to_string(),
        };
        let data = self.execute::<GetPerson>(variables).await?;
        let person = data
            .find_unique_person
            .map(convert_get_person)
            .ok_or_else(|| CrmError::NotFound(id.to_string()))?;

        self.inner.cache.insert(id.clone(), person.clone()).await;
        Ok(person)
    }

    /// List people with server-side ordering and paging.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_people(&self, params: PeopleListParams) -> Result<Vec<Person>, CrmError> {
        let variables = people_list_variables(&params);
        let data = self.execute::<GetPeople>(variables).await?;

        let people: Vec<Person> = data
            .find_many_person
            .into_iter()
            .map(convert_get_people_item)
            .collect();

        debug!(count = people.len(), "Fetched people");
        Ok(people)
    }

    /// Create a person.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the server rejects the input.
    #[instrument(skip(self, draft), fields(person_id = %draft.id))]
    pub async fn insert_person(&self, draft: PersonDraft) -> Result<Person, CrmError> {
        let variables = create_one_person::Variables {
            data: create_one_person::PersonCreateInput {
                id: Some(draft.id.to_string()),
                first_name: draft.first_name,
                last_name: draft.last_name,
                email: None,
                phone: None,
                city: None,
                job_title: None,
            },
        };

        let data = self.execute::<CreateOnePerson>(variables).await?;
        Ok(convert_created_person(data.create_one_person))
    }

    /// Update a single field of a person.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the server rejects the value.
    #[instrument(skip(self, patch), fields(person_id = %id, field = %patch.field))]
    pub async fn patch_person(&self, id: &PersonId, patch: &FieldPatch) -> Result<Person, CrmError> {
        let variables = update_one_person::Variables {
            id: id.to_string(),
            data: field_patch_input(patch),
        };

        let result = self.execute::<UpdateOnePerson>(variables).await;
        self.invalidate(std::slice::from_ref(id)).await;
        Ok(convert_updated_person(result?.update_one_person))
    }

    /// Delete people by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn remove_people(&self, ids: Vec<PersonId>) -> Result<u64, CrmError> {
        let variables = delete_many_person::Variables {
            ids: ids.iter().map(ToString::to_string).collect(),
        };

        let result = self.execute::<DeleteManyPerson>(variables).await;
        self.invalidate(&ids).await;
        let count = result?.delete_many_person.count;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl PeopleApi for CrmClient {
    async fn get_person(&self, id: &PersonId) -> Result<Person, CrmError> {
        self.fetch_person(id).await
    }

    async fn list_people(&self, params: PeopleListParams) -> Result<Vec<Person>, CrmError> {
        self.fetch_people(params).await
    }

    async fn create_person(&self, draft: PersonDraft) -> Result<Person, CrmError> {
        self.insert_person(draft).await
    }

    async fn update_person_field(
        &self,
        id: &PersonId,
        patch: FieldPatch,
    ) -> Result<Person, CrmError> {
        self.patch_person(id, &patch).await
    }

    async fn delete_people(&self, ids: Vec<PersonId>) -> Result<u64, CrmError> {
        self.remove_people(ids).await
    }
}
