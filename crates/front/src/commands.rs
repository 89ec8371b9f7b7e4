//! Mutation dispatch.
//!
//! Every server mutation goes through [`MutationDispatcher::dispatch`]:
//! 1. The caller has already applied the optimistic store change
//! 2. The request is spawned onto the tokio runtime
//! 3. On success the store is reconciled with the server's record
//! 4. On failure the optimistic change is rolled back and a notice published
//!
//! The caller gets a [`MutationTicket`] right away; awaiting it is optional.

use std::sync::Arc;

use orbit_core::PersonId;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{Instrument, error, info, info_span, warn};

use crate::crm::{CrmError, FieldPatch, PeopleApi, Person, PersonDraft};
use crate::notices::NoticeBoard;
use crate::store::{PatchTicket, RecordStore, RemovedRecord, StoreError};

/// A server mutation whose optimistic part is already in the store.
#[derive(Debug)]
pub enum Mutation {
    /// Create a person; the placeholder is keyed by `draft.id`.
    CreatePerson(PersonDraft),
    /// Update one field; the optimistic patch is tracked by `ticket`.
    UpdatePersonField {
        id: PersonId,
        ticket: PatchTicket,
        patch: FieldPatch,
    },
    /// Delete people; `removed` restores them on failure.
    DeletePeople { removed: Vec<RemovedRecord> },
}

impl Mutation {
    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::CreatePerson(_) => MutationKind::Create,
            Self::UpdatePersonField { .. } => MutationKind::Update,
            Self::DeletePeople { .. } => MutationKind::Delete,
        }
    }

    fn ids(&self) -> Vec<PersonId> {
        match self {
            Self::CreatePerson(draft) => vec![draft.id.clone()],
            Self::UpdatePersonField { id, .. } => vec![id.clone()],
            Self::DeletePeople { removed } => removed.iter().map(|r| r.id().clone()).collect(),
        }
    }
}

/// Kind of a dispatched mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Successful mutation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutput {
    Created(Person),
    Updated(Person),
    Deleted(u64),
}

/// Failed mutation result. The optimistic change has been rolled back.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The task ended without reporting (runtime shut down).
    #[error("mutation task dropped before completing")]
    Dropped,
}

/// Handle for one dispatched mutation.
#[derive(Debug)]
pub struct MutationTicket {
    kind: MutationKind,
    ids: Vec<PersonId>,
    receiver: oneshot::Receiver<Result<MutationOutput, MutationError>>,
}

impl MutationTicket {
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Ids the mutation affects.
    #[must_use]
    pub fn ids(&self) -> &[PersonId] {
        &self.ids
    }

    /// Wait for the server round-trip and the store reconciliation.
    ///
    /// # Errors
    ///
    /// Returns the mutation's failure, after rollback has been applied.
    pub async fn outcome(self) -> Result<MutationOutput, MutationError> {
        self.receiver.await.unwrap_or(Err(MutationError::Dropped))
    }
}

/// Runs mutations against the API and reconciles the store.
pub struct MutationDispatcher<A> {
    api: Arc<A>,
    store: RecordStore,
    notices: NoticeBoard,
}

impl<A> Clone for MutationDispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            store: self.store.clone(),
            notices: self.notices.clone(),
        }
    }
}

impl<A: PeopleApi> MutationDispatcher<A> {
    #[must_use]
    pub const fn new(api: Arc<A>, store: RecordStore, notices: NoticeBoard) -> Self {
        Self {
            api,
            store,
            notices,
        }
    }

    /// Spawn the server request for a mutation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, mutation: Mutation) -> MutationTicket {
        let kind = mutation.kind();
        let ids = mutation.ids();
        let (sender, receiver) = oneshot::channel();
        let this = self.clone();
        let span = info_span!("mutation", %kind, count = ids.len());

        tokio::spawn(
            async move {
                let result = this.run(mutation).await;
                // The caller may have dropped the ticket.
                let _ = sender.send(result);
            }
            .instrument(span),
        );

        MutationTicket {
            kind,
            ids,
            receiver,
        }
    }

    async fn run(&self, mutation: Mutation) -> Result<MutationOutput, MutationError> {
        match mutation {
            Mutation::CreatePerson(draft) => self.create(draft).await,
            Mutation::UpdatePersonField { id, ticket, patch } => {
                self.update(id, ticket, patch).await
            }
            Mutation::DeletePeople { removed } => self.delete(removed).await,
        }
    }

    async fn create(&self, draft: PersonDraft) -> Result<MutationOutput, MutationError> {
        let id = draft.id.clone();
        let result = match self.api.create_person(draft).await {
            Ok(server) if server.id == id => Ok(server),
            Ok(server) => Err(CrmError::ReconciliationConflict {
                expected: id.clone(),
                actual: server.id,
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(server) => {
                self.store.confirm_creation(&id, server.clone())?;
                info!(person_id = %id, "Person created");
                Ok(MutationOutput::Created(server))
            }
            Err(e) => {
                error!(person_id = %id, error = %e, "Person creation failed");
                if let Err(store_err) = self.store.fail_creation(&id) {
                    warn!(person_id = %id, error = %store_err, "Placeholder already gone");
                }
                self.notices
                    .error(format!("Could not create person: {e}"), Some(id));
                Err(e.into())
            }
        }
    }

    async fn update(
        &self,
        id: PersonId,
        ticket: PatchTicket,
        patch: FieldPatch,
    ) -> Result<MutationOutput, MutationError> {
        let field = patch.field;
        match self.api.update_person_field(&id, patch).await {
            Ok(server) => {
                self.store.confirm_patch(&id, ticket, &server)?;
                info!(person_id = %id, %field, "Field updated");
                Ok(MutationOutput::Updated(server))
            }
            Err(e) => {
                error!(person_id = %id, %field, error = %e, "Field update failed");
                if let Err(store_err) = self.store.revert_patch(&id, ticket) {
                    warn!(person_id = %id, error = %store_err, "Patch already gone");
                }
                self.notices
                    .error(format!("Could not update {field}: {e}"), Some(id));
                Err(e.into())
            }
        }
    }

    async fn delete(&self, removed: Vec<RemovedRecord>) -> Result<MutationOutput, MutationError> {
        let ids: Vec<PersonId> = removed.iter().map(|r| r.id().clone()).collect();
        match self.api.delete_people(ids).await {
            Ok(count) => {
                info!(count, "People deleted");
                Ok(MutationOutput::Deleted(count))
            }
            Err(e) => {
                let count = removed.len();
                error!(count, error = %e, "Delete failed, restoring rows");
                self.store.restore(removed);
                self.notices
                    .error(format!("Could not delete {count} people: {e}"), None);
                Err(e.into())
            }
        }
    }
}
