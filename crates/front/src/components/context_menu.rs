//! Row context menu.
//!
//! Opening the menu on a row that is not selected makes it the only
//! selected row. The menu lists the same entries as the action bar and
//! closes after any command.

use std::sync::{Mutex, PoisonError};

use orbit_core::PersonId;
use serde::Serialize;

use super::action_bar::ActionBarEntry;

/// Screen position the menu opens at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct MenuPosition {
    pub x: i32,
    pub y: i32,
}

/// Rendered open menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextMenuView {
    pub row: PersonId,
    pub position: MenuPosition,
    pub entries: Vec<ActionBarEntry>,
}

#[derive(Debug, Clone)]
struct OpenMenu {
    row: PersonId,
    position: MenuPosition,
}

/// Open/closed state of the context menu.
#[derive(Debug, Default)]
pub struct ContextMenu {
    open: Mutex<Option<OpenMenu>>,
}

impl ContextMenu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open at `position` for `row`.
    pub fn open(&self, row: PersonId, position: MenuPosition) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = Some(OpenMenu { row, position });
    }

    pub fn close(&self) {
        self.open.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Render with the given entries, or `None` when closed.
    #[must_use]
    pub fn render(&self, entries: &[ActionBarEntry]) -> Option<ContextMenuView> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|menu| ContextMenuView {
                row: menu.row.clone(),
                position: menu.position,
                entries: entries.to_vec(),
            })
    }
}
