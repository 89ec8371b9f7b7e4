//! Client-side record store.
//!
//! The store is the authoritative local copy of people, keyed by id. It is
//! an explicit handle passed to every component (cloning shares the same
//! data). Every operation touches only the entry for the id it names.
//!
//! # Entry model
//!
//! Each entry keeps the last confirmed server copy plus an ordered list of
//! in-flight field patches. The record everyone sees is the confirmed copy
//! with the pending patches applied on top. This lets concurrent edits of
//! one record succeed or fail independently:
//!
//! - a confirmed patch is folded into the confirmed copy,
//! - a failed patch is dropped, which reverts exactly that field.
//!
//! A placeholder created on the client has no confirmed copy until the
//! server echoes it back.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use orbit_core::{PersonId, RecordState};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::crm::{FieldPatch, FieldValue, Person, PersonField};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An entry with this id already exists.
    #[error("record {0} already exists")]
    AlreadyExists(PersonId),

    /// No entry with this id.
    #[error("record {0} not found")]
    NotFound(PersonId),

    /// The entry is a placeholder still waiting for its creation response.
    #[error("record {0} is still being created")]
    CreationPending(PersonId),

    /// The entry was already confirmed by the server.
    #[error("record {0} is not a pending creation")]
    NotPendingCreation(PersonId),

    /// The entry has field patches waiting on the server.
    #[error("record {0} has unsaved edits")]
    PatchesPending(PersonId),

    /// The value kind does not fit the field.
    #[error("value does not fit field {field} of record {id}")]
    FieldMismatch { id: PersonId, field: PersonField },

    /// The patch ticket is unknown for this entry.
    #[error("no pending patch {ticket} on record {id}")]
    UnknownTicket { id: PersonId, ticket: PatchTicket },
}

/// Identifies one in-flight field patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PatchTicket(u64);

impl std::fmt::Display for PatchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Change notifications, used as re-render triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A record entered the store.
    Inserted { id: PersonId, state: RecordState },
    /// A field was changed optimistically.
    Patched { id: PersonId, field: PersonField },
    /// Server state replaced local state for the record.
    Reconciled { id: PersonId },
    /// A failed patch was dropped and the field restored.
    Reverted { id: PersonId, field: PersonField },
    /// A record left the store.
    Removed { id: PersonId },
}

/// One store entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    confirmed: Option<Person>,
    pending: Vec<(PatchTicket, FieldPatch)>,
    current: Person,
    state: RecordState,
}

impl RecordEntry {
    fn confirmed(person: Person) -> Self {
        Self {
            current: person.clone(),
            confirmed: Some(person),
            pending: Vec::new(),
            state: RecordState::Confirmed,
        }
    }

    fn placeholder(person: Person) -> Self {
        Self {
            confirmed: None,
            pending: Vec::new(),
            current: person,
            state: RecordState::Pending,
        }
    }

    /// The record as displayed.
    #[must_use]
    pub const fn current(&self) -> &Person {
        &self.current
    }

    /// The last server-confirmed copy, if any.
    #[must_use]
    pub const fn last_confirmed(&self) -> Option<&Person> {
        self.confirmed.as_ref()
    }

    #[must_use]
    pub const fn state(&self) -> RecordState {
        self.state
    }

    /// Whether this is a placeholder waiting on its creation response.
    #[must_use]
    pub const fn is_pending_creation(&self) -> bool {
        self.confirmed.is_none()
    }

    /// Number of in-flight field patches.
    #[must_use]
    pub fn pending_patches(&self) -> usize {
        self.pending.len()
    }

    /// Rebuild `current` from the confirmed copy and pending patches.
    fn rematerialize(&mut self) {
        let Some(confirmed) = &self.confirmed else {
            return;
        };
        let mut current = confirmed.clone();
        for (_, patch) in &self.pending {
            current.set(patch.field, patch.value.clone());
        }
        self.current = current;
        self.state = if self.pending.is_empty() {
            RecordState::Confirmed
        } else {
            RecordState::Pending
        };
    }
}

/// A record taken out of the store, with enough context to put it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedRecord {
    position: usize,
    id: PersonId,
    entry: RecordEntry,
}

impl RemovedRecord {
    #[must_use]
    pub const fn id(&self) -> &PersonId {
        &self.id
    }
}

#[derive(Default)]
struct StoreInner {
    order: Vec<PersonId>,
    entries: HashMap<PersonId, RecordEntry>,
    next_ticket: u64,
}

impl StoreInner {
    fn entry_mut(&mut self, id: &PersonId) -> Result<&mut RecordEntry, StoreError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn remove(&mut self, id: &PersonId) -> Option<RemovedRecord> {
        let entry = self.entries.remove(id)?;
        let position = self.order.iter().position(|o| o == id).unwrap_or(0);
        self.order.retain(|o| o != id);
        Some(RemovedRecord {
            position,
            id: id.clone(),
            entry,
        })
    }
}

/// Shared handle to the record store.
#[derive(Clone)]
pub struct RecordStore {
    inner: Arc<RwLock<StoreInner>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StoreEvent) {
        debug!(?event, "Store event");
        let _ = self.events.send(event);
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The displayed record for `id`.
    #[must_use]
    pub fn get(&self, id: &PersonId) -> Option<Person> {
        self.read().entries.get(id).map(|e| e.current.clone())
    }

    /// Full entry snapshot for `id`.
    #[must_use]
    pub fn entry(&self, id: &PersonId) -> Option<RecordEntry> {
        self.read().entries.get(id).cloned()
    }

    #[must_use]
    pub fn state(&self, id: &PersonId) -> Option<RecordState> {
        self.read().entries.get(id).map(|e| e.state)
    }

    #[must_use]
    pub fn contains(&self, id: &PersonId) -> bool {
        self.read().entries.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().order.is_empty()
    }

    /// Ids in display order.
    #[must_use]
    pub fn ids(&self) -> Vec<PersonId> {
        self.read().order.clone()
    }

    /// Every entry, in display order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecordEntry> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id))
            .cloned()
            .collect()
    }

    // =========================================================================
    // Server responses
    // =========================================================================

    /// Merge a query response into the store.
    ///
    /// Known ids get a new confirmed copy (pending patches stay on top);
    /// unknown ids are appended. Placeholders are left alone.
    pub fn load(&self, people: Vec<Person>) -> usize {
        let mut events = Vec::with_capacity(people.len());
        let count = people.len();
        {
            let mut inner = self.write();
            for person in people {
                let id = person.id.clone();
                match inner.entries.get_mut(&id) {
                    Some(entry) if entry.is_pending_creation() => {}
                    Some(entry) => {
                        entry.confirmed = Some(person);
                        entry.rematerialize();
                        events.push(StoreEvent::Reconciled { id });
                    }
                    None => {
                        inner.order.push(id.clone());
                        inner.entries.insert(id.clone(), RecordEntry::confirmed(person));
                        events.push(StoreEvent::Inserted {
                            id,
                            state: RecordState::Confirmed,
                        });
                    }
                }
            }
        }
        for event in events {
            self.emit(event);
        }
        count
    }

    /// Insert or refresh a single confirmed record (refetch on miss).
    pub fn upsert_confirmed(&self, person: Person) {
        self.load(vec![person]);
    }

    // =========================================================================
    // Optimistic creation
    // =========================================================================

    /// Insert a placeholder at the top of the display order.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if the id is taken.
    pub fn insert_optimistic(&self, person: Person) -> Result<(), StoreError> {
        let id = person.id.clone();
        {
            let mut inner = self.write();
            if inner.entries.contains_key(&id) {
                return Err(StoreError::AlreadyExists(id));
            }
            inner.order.insert(0, id.clone());
            inner
                .entries
                .insert(id.clone(), RecordEntry::placeholder(person));
        }
        self.emit(StoreEvent::Inserted {
            id,
            state: RecordState::Pending,
        });
        Ok(())
    }

    /// Replace a placeholder with the server's record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the placeholder is gone, or `NotPendingCreation`
    /// if it was already confirmed.
    pub fn confirm_creation(&self, id: &PersonId, server: Person) -> Result<(), StoreError> {
        {
            let mut inner = self.write();
            let entry = inner.entry_mut(id)?;
            if !entry.is_pending_creation() {
                return Err(StoreError::NotPendingCreation(id.clone()));
            }
            entry.confirmed = Some(server);
            entry.rematerialize();
        }
        self.emit(StoreEvent::Reconciled { id: id.clone() });
        Ok(())
    }

    /// Roll back a placeholder whose creation failed.
    ///
    /// The entry is marked `Failed` and removed; other entries are untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NotPendingCreation`.
    pub fn fail_creation(&self, id: &PersonId) -> Result<Person, StoreError> {
        let removed = {
            let mut inner = self.write();
            let entry = inner.entry_mut(id)?;
            if !entry.is_pending_creation() {
                return Err(StoreError::NotPendingCreation(id.clone()));
            }
            entry.state = RecordState::Failed;
            inner
                .remove(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?
        };
        self.emit(StoreEvent::Removed { id: id.clone() });
        Ok(removed.entry.current)
    }

    // =========================================================================
    // Field patches
    // =========================================================================

    /// Apply a field change optimistically.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `CreationPending` for placeholders, or
    /// `FieldMismatch` if the value kind does not fit the field.
    pub fn apply_patch(&self, id: &PersonId, patch: FieldPatch) -> Result<PatchTicket, StoreError> {
        let field = patch.field;
        let ticket = {
            let mut inner = self.write();
            let ticket = PatchTicket(inner.next_ticket);
            let entry = inner.entry_mut(id)?;
            if entry.is_pending_creation() {
                return Err(StoreError::CreationPending(id.clone()));
            }
            let mut candidate = entry.current.clone();
            if !candidate.set(field, patch.value.clone()) {
                return Err(StoreError::FieldMismatch {
                    id: id.clone(),
                    field,
                });
            }
            entry.pending.push((ticket, patch));
            entry.rematerialize();
            inner.next_ticket += 1;
            ticket
        };
        self.emit(StoreEvent::Patched {
            id: id.clone(),
            field,
        });
        Ok(ticket)
    }

    /// Fold a confirmed patch into the confirmed copy.
    ///
    /// Only the patched field is taken from `server`, so the rest of the
    /// entry is unaffected by the update.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `UnknownTicket`.
    pub fn confirm_patch(
        &self,
        id: &PersonId,
        ticket: PatchTicket,
        server: &Person,
    ) -> Result<(), StoreError> {
        {
            let mut inner = self.write();
            let entry = inner.entry_mut(id)?;
            let patch = take_patch(entry, id, ticket)?;
            if let Some(confirmed) = entry.confirmed.as_mut() {
                confirmed.set(patch.field, server.get(patch.field));
            }
            entry.rematerialize();
        }
        self.emit(StoreEvent::Reconciled { id: id.clone() });
        Ok(())
    }

    /// Drop a failed patch, restoring the field's last known-good value.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `UnknownTicket`.
    pub fn revert_patch(&self, id: &PersonId, ticket: PatchTicket) -> Result<FieldValue, StoreError> {
        let (field, restored) = {
            let mut inner = self.write();
            let entry = inner.entry_mut(id)?;
            let patch = take_patch(entry, id, ticket)?;
            entry.rematerialize();
            (patch.field, entry.current.get(patch.field))
        };
        self.emit(StoreEvent::Reverted {
            id: id.clone(),
            field,
        });
        Ok(restored)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove records, returning what is needed to restore them.
    ///
    /// Unknown ids are skipped. Nothing is removed if any of the records
    /// still has a request in flight, since its response would land on a
    /// record that is no longer here.
    ///
    /// # Errors
    ///
    /// Returns `CreationPending` for a placeholder, or `PatchesPending` for
    /// a record with unconfirmed edits.
    pub fn remove_many(&self, ids: &[PersonId]) -> Result<Vec<RemovedRecord>, StoreError> {
        let removed: Vec<RemovedRecord> = {
            let mut inner = self.write();
            for id in ids {
                match inner.entries.get(id) {
                    Some(entry) if entry.is_pending_creation() => {
                        return Err(StoreError::CreationPending(id.clone()));
                    }
                    Some(entry) if !entry.pending.is_empty() => {
                        return Err(StoreError::PatchesPending(id.clone()));
                    }
                    _ => {}
                }
            }
            ids.iter().filter_map(|id| inner.remove(id)).collect()
        };
        for record in &removed {
            self.emit(StoreEvent::Removed {
                id: record.id.clone(),
            });
        }
        Ok(removed)
    }

    /// Put removed records back at their original positions.
    ///
    /// Records whose id has been re-used in the meantime are skipped.
    pub fn restore(&self, mut removed: Vec<RemovedRecord>) {
        // Removal recorded each position after the earlier removals, so
        // reinserting in reverse order lands every record where it was.
        removed.reverse();
        let mut restored = Vec::with_capacity(removed.len());
        {
            let mut inner = self.write();
            for record in removed {
                if inner.entries.contains_key(&record.id) {
                    continue;
                }
                let position = record.position.min(inner.order.len());
                inner.order.insert(position, record.id.clone());
                let state = record.entry.state;
                inner.entries.insert(record.id.clone(), record.entry);
                restored.push((record.id, state));
            }
        }
        for (id, state) in restored {
            self.emit(StoreEvent::Inserted { id, state });
        }
    }
}

fn take_patch(
    entry: &mut RecordEntry,
    id: &PersonId,
    ticket: PatchTicket,
) -> Result<FieldPatch, StoreError> {
    let index = entry
        .pending
        .iter()
        .position(|(t, _)| *t == ticket)
        .ok_or_else(|| StoreError::UnknownTicket {
            id: id.clone(),
            ticket,
        })?;
    Ok(entry.pending.remove(index).1)
}
