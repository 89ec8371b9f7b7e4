//! Action bar shown while rows are selected.
//!
//! Each entry is a label, an icon and a handler key. The bar resolves a key
//! into the [`ActionHandler`] the page should run, enforcing that a
//! selection exists and that danger actions were confirmed.

use serde::Serialize;
use thiserror::Error;

/// Errors raised when running an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("no rows selected")]
    EmptySelection,

    /// Danger actions must be confirmed by the user first.
    #[error("action {0} requires confirmation")]
    ConfirmationRequired(String),
}

/// Visual weight of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Standard,
    Danger,
}

/// What an action does, interpreted by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionHandler {
    DeleteSelected,
    ClearSelection,
}

/// A command in the bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionBarEntry {
    /// Action key (passed to event handler).
    pub key: String,
    /// Display label.
    pub label: String,
    /// Phosphor icon class.
    pub icon: String,
    pub kind: ActionKind,
    #[serde(skip)]
    pub handler: ActionHandler,
}

impl ActionBarEntry {
    #[must_use]
    pub fn new(key: &str, label: &str, icon: &str, handler: ActionHandler) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            kind: ActionKind::Standard,
            handler,
        }
    }

    /// Mark this action as destructive.
    #[must_use]
    pub const fn danger(mut self) -> Self {
        self.kind = ActionKind::Danger;
        self
    }
}

/// Rendered bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionBarView {
    pub visible: bool,
    pub selected_count: usize,
    pub entries: Vec<ActionBarEntry>,
}

/// Selection-scoped command set.
#[derive(Debug, Clone, Default)]
pub struct ActionBar {
    entries: Vec<ActionBarEntry>,
}

impl ActionBar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    #[must_use]
    pub fn entry(mut self, entry: ActionBarEntry) -> Self {
        self.entries.push(entry);
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[ActionBarEntry] {
        &self.entries
    }

    /// Render for the given selection size. Hidden when nothing is selected.
    #[must_use]
    pub fn render(&self, selected_count: usize) -> ActionBarView {
        let visible = selected_count > 0;
        ActionBarView {
            visible,
            selected_count,
            entries: if visible {
                self.entries.clone()
            } else {
                Vec::new()
            },
        }
    }

    /// Resolve an action key against the current selection.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAction`, `EmptySelection`, or `ConfirmationRequired`
    /// for an unconfirmed danger action.
    pub fn resolve(
        &self,
        key: &str,
        selected_count: usize,
        confirmed: bool,
    ) -> Result<ActionHandler, ActionError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.key == key)
            .ok_or_else(|| ActionError::UnknownAction(key.to_string()))?;
        if selected_count == 0 {
            return Err(ActionError::EmptySelection);
        }
        if entry.kind == ActionKind::Danger && !confirmed {
            return Err(ActionError::ConfirmationRequired(entry.key.clone()));
        }
        Ok(entry.handler)
    }
}

/// Commands offered on the People page.
#[must_use]
pub fn people_action_bar() -> ActionBar {
    ActionBar::new()
        .entry(
            ActionBarEntry::new("delete", "Delete", "ph-trash", ActionHandler::DeleteSelected)
                .danger(),
        )
        .entry(ActionBarEntry::new(
            "deselect",
            "Clear selection",
            "ph-x",
            ActionHandler::ClearSelection,
        ))
}
