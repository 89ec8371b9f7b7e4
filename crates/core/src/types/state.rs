//! Lifecycle state of a locally cached record.

use serde::{Deserialize, Serialize};

/// Where a cached record stands relative to the server.
///
/// A record created on the client starts `Pending` and moves to either
/// `Confirmed` (server echoed it) or `Failed` (server rejected it). A
/// confirmed record goes back to `Pending` while a field update is in
/// flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// A local change has not been acknowledged by the server yet.
    Pending,
    /// The local copy matches the last server response.
    #[default]
    Confirmed,
    /// The server rejected the change; the entry is about to be rolled back.
    Failed,
}

impl RecordState {
    /// Whether the record still waits on a server response.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether `next` is a legal transition from `self`.
    ///
    /// `Failed` is terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Failed | Self::Pending)
                | (Self::Confirmed, Self::Pending | Self::Confirmed)
        )
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
