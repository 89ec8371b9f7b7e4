//! GraphQL operation definitions for the CRM API.
//!
//! Uses `graphql_client` to generate type-safe Rust code from GraphQL queries.

use graphql_client::GraphQLQuery;

// =============================================================================
// Custom scalar type aliases (used by graphql_client)
// =============================================================================

/// ISO 8601 date-time string.
type DateTime = String;

// =============================================================================
// Read operations
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/people.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetPerson;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/people.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct GetPeople;

// =============================================================================
// Write operations
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/people.graphql",
    response_derives = "Debug, Clone",
    skip_serializing_none
)]
pub struct CreateOnePerson;

// Only the edited field may reach the server; unset fields are omitted, not nulled.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/people.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Default",
    skip_serializing_none
)]
pub struct UpdateOnePerson;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/people.graphql",
    response_derives = "Debug, Clone"
)]
pub struct DeleteManyPerson;
