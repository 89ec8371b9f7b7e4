//! User-visible notices.
//!
//! Failed mutations publish a [`Notice`] here. The board keeps a bounded
//! backlog for clients that poll and broadcasts each notice to live
//! subscribers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use orbit_core::PersonId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

const DEFAULT_BACKLOG: usize = 100;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message meant for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Record the notice is about, if any.
    pub person_id: Option<PersonId>,
    pub at: DateTime<Utc>,
}

/// Shared notice board. Cloning yields another handle to the same board.
#[derive(Clone)]
pub struct NoticeBoard {
    inner: Arc<Mutex<VecDeque<Notice>>>,
    sender: broadcast::Sender<Notice>,
    capacity: usize,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_BACKLOG)
    }
}

impl NoticeBoard {
    /// Create a board that keeps at most `capacity` undelivered notices.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            sender,
            capacity,
        }
    }

    /// Publish an error notice.
    pub fn error(&self, message: impl Into<String>, person_id: Option<PersonId>) {
        let message = message.into();
        warn!(person_id = ?person_id, %message, "Surfacing error to user");
        self.publish(Notice {
            level: NoticeLevel::Error,
            message,
            person_id,
            at: Utc::now(),
        });
    }

    /// Publish an informational notice.
    pub fn info(&self, message: impl Into<String>, person_id: Option<PersonId>) {
        self.publish(Notice {
            level: NoticeLevel::Info,
            message: message.into(),
            person_id,
            at: Utc::now(),
        });
    }

    fn publish(&self, notice: Notice) {
        {
            let mut backlog = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if backlog.len() == self.capacity {
                backlog.pop_front();
            }
            backlog.push_back(notice.clone());
        }
        // No live subscribers is fine; the backlog still holds it.
        let _ = self.sender.send(notice);
    }

    /// Subscribe to notices published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Take every notice in the backlog, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Notice> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Number of notices waiting in the backlog.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
