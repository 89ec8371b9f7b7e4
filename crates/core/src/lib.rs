//! Orbit Core - Shared types library.
//!
//! This crate provides common types used across the Orbit workspace:
//! - `front` - People workspace (record store, table components, HTTP front)
//! - `integration-tests` - Cross-crate behavior tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and record states

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
