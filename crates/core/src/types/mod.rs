//! Core types for Orbit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod state;

pub use email::{Email, EmailError};
pub use id::*;
pub use state::RecordState;
