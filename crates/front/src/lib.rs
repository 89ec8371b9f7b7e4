//! Orbit People workspace.
//!
//! The People page of the Orbit CRM: a table of person records backed by
//! the CRM GraphQL API, with inline cell editing, an action bar, and
//! optimistic record creation.
//!
//! # Architecture
//!
//! - [`crm`] talks to the CRM server through the [`crm::PeopleApi`] seam
//! - [`store::RecordStore`] holds the client-side records and their
//!   optimistic patches
//! - [`commands::MutationDispatcher`] runs server mutations in the
//!   background and reconciles or rolls back the store
//! - [`components`] and [`pages`] turn store contents into table views
//! - [`routes`] expose the page as JSON endpoints
//!
//! # Example
//!
//! ```rust,ignore
//! use orbit_front::{crm::CrmClient, state::AppState};
//!
//! let state = AppState::new(CrmClient::new(&config.crm), config.page_size);
//! state.people().load().await?;
//! let ticket = state.people().add_person()?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commands;
pub mod components;
pub mod config;
pub mod crm;
pub mod error;
pub mod notices;
pub mod pages;
pub mod routes;
pub mod state;
pub mod store;
