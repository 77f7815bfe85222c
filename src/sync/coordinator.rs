//! Optimistic mutations with per-mutation rollback.
//!
//! `begin` applies a change to the list straight away and records a snapshot
//! of exactly what it touched; `resolve` either drops that snapshot (commit)
//! or writes it back (rollback). Snapshots live in a table keyed by mutation
//! id, so concurrent mutations never restore over each other.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::state::{FailureNotice, ListState};
use crate::api::{ApiError, TaskApi};
use crate::model::task::{Deadline, TaskId, TaskItem, TaskStatus};
use crate::ops::task_ops::{self, TaskField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MutationId(pub u64);

impl std::fmt::Display for MutationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    Create,
    Delete,
    UpdateStatus,
    UpdateBookmark,
    UpdateDeadline,
}

/// A user action that changes list content
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    Create { content: String, at_index: usize },
    Delete { id: TaskId },
    SetStatus { id: TaskId, status: TaskStatus },
    ToggleStatus { id: TaskId },
    ToggleBookmark { id: TaskId },
    SetDeadline { id: TaskId, deadline: Option<Deadline> },
}

impl MutationRequest {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationRequest::Create { .. } => MutationKind::Create,
            MutationRequest::Delete { .. } => MutationKind::Delete,
            MutationRequest::SetStatus { .. } | MutationRequest::ToggleStatus { .. } => {
                MutationKind::UpdateStatus
            }
            MutationRequest::ToggleBookmark { .. } => MutationKind::UpdateBookmark,
            MutationRequest::SetDeadline { .. } => MutationKind::UpdateDeadline,
        }
    }
}

/// The server call that confirms a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Create { content: String },
    Delete { id: TaskId },
    UpdateStatus { id: TaskId, status: TaskStatus },
    UpdateBookmark { id: TaskId },
    UpdateDeadline { id: TaskId, deadline: Option<Deadline> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteReply {
    Created(TaskId),
    Done,
}

impl RemoteCall {
    pub async fn execute(&self, api: &dyn TaskApi) -> Result<RemoteReply, ApiError> {
        match self {
            RemoteCall::Create { content } => api.create_item(content).await.map(RemoteReply::Created),
            RemoteCall::Delete { id } => api.delete_item(*id).await.map(|_| RemoteReply::Done),
            RemoteCall::UpdateStatus { id, status } => api
                .update_status(*id, *status)
                .await
                .map(|_| RemoteReply::Done),
            RemoteCall::UpdateBookmark { id } => {
                api.update_bookmark(*id).await.map(|_| RemoteReply::Done)
            }
            RemoteCall::UpdateDeadline { id, deadline } => api
                .update_deadline(*id, *deadline)
                .await
                .map(|_| RemoteReply::Done),
        }
    }
}

/// Where a deleted item sat. Neighbour lists are nearest first and include
/// items that other pending deletes have taken out of the list.
#[derive(Debug, Clone, PartialEq)]
struct Anchor {
    before: Vec<TaskId>,
    after: Vec<TaskId>,
    index: usize,
}

impl Anchor {
    fn capture(order: &[TaskId], id: TaskId, index: usize) -> Anchor {
        let at = order.iter().position(|o| *o == id).unwrap_or(order.len());
        Anchor {
            before: order[..at].iter().rev().copied().collect(),
            after: order.get(at + 1..).unwrap_or_default().to_vec(),
            index,
        }
    }

    /// Slot to put the item back at: right after the nearest earlier
    /// neighbour still listed, else right before the nearest later one, else
    /// its old index.
    fn slot<F>(&self, len: usize, position: F) -> usize
    where
        F: Fn(TaskId) -> Option<usize>,
    {
        if let Some(i) = self.before.iter().find_map(|id| position(*id)) {
            return i + 1;
        }
        if let Some(i) = self.after.iter().find_map(|id| position(*id)) {
            return i;
        }
        self.index.min(len)
    }
}

/// What a mutation touched, as it was before the mutation
#[derive(Debug, Clone, PartialEq)]
enum Snapshot {
    /// A temporary item was inserted
    Inserted(TaskId),
    /// An item was removed
    Removed { item: TaskItem, anchor: Anchor },
    /// One field was overwritten
    Field {
        id: TaskId,
        previous: TaskField,
        applied: TaskField,
    },
}

/// A mutation awaiting its server response
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub id: MutationId,
    pub kind: MutationKind,
    pub target: TaskId,
    snapshot: Snapshot,
}

/// A mutation that was applied locally and whose call must now be issued
#[derive(Debug, Clone, PartialEq)]
pub struct Issued {
    pub id: MutationId,
    pub kind: MutationKind,
    pub target: TaskId,
    pub call: RemoteCall,
}

/// Rejections raised before anything is applied
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("task {0} is still being created")]
    Unconfirmed(TaskId),
}

/// Outcome of feeding a server response to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Committed {
        id: MutationId,
        kind: MutationKind,
        target: TaskId,
    },
    RolledBack(FailureNotice),
    /// No pending mutation has this id (already resolved)
    Unknown(MutationId),
}

#[derive(Debug)]
pub struct MutationCoordinator {
    pending: IndexMap<MutationId, PendingMutation>,
    next_mutation: u64,
    next_temp_id: i64,
}

impl Default for MutationCoordinator {
    fn default() -> Self {
        MutationCoordinator {
            pending: IndexMap::new(),
            next_mutation: 1,
            next_temp_id: -1,
        }
    }
}

impl MutationCoordinator {
    pub fn new() -> Self {
        MutationCoordinator::default()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingMutation> {
        self.pending.values()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn is_in_flight(&self, id: MutationId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Current list order with the items of pending deletes put back
    fn order_with_pending_deletes(&self, state: &ListState) -> Vec<TaskId> {
        let mut order = state.items.ids();
        for pending in self.pending.values() {
            if let Snapshot::Removed { item, anchor } = &pending.snapshot {
                if !order.contains(&item.id) {
                    let at = anchor.slot(order.len(), |id| order.iter().position(|o| *o == id));
                    order.insert(at, item.id);
                }
            }
        }
        order
    }

    fn allocate_temp_id(&mut self, state: &ListState) -> TaskId {
        loop {
            let id = TaskId(self.next_temp_id);
            self.next_temp_id -= 1;
            if !state.items.contains(id) {
                return id;
            }
        }
    }

    /// Apply `request` to `state` optimistically and describe the call that
    /// confirms it. On error nothing has changed.
    pub fn begin(
        &mut self,
        state: &mut ListState,
        request: MutationRequest,
    ) -> Result<Issued, MutationError> {
        let kind = request.kind();
        let (target, snapshot, call) = match request {
            MutationRequest::Create { content, at_index } => {
                let content = task_ops::validate_content(&content).map_err(MutationError::Validation)?;
                let temp = self.allocate_temp_id(state);
                state
                    .items
                    .insert_local(TaskItem::new(temp, content.clone()), at_index)
                    .map_err(|_| MutationError::Unconfirmed(temp))?;
                (temp, Snapshot::Inserted(temp), RemoteCall::Create { content })
            }
            MutationRequest::Delete { id } => {
                Self::check_confirmed(state, id)?;
                let order = self.order_with_pending_deletes(state);
                let (item, index) = state
                    .items
                    .remove(id)
                    .map_err(|_| MutationError::NotFound(id))?;
                if state.selected == Some(id) {
                    state.selected = None;
                }
                let anchor = Anchor::capture(&order, id, index);
                (id, Snapshot::Removed { item, anchor }, RemoteCall::Delete { id })
            }
            MutationRequest::SetStatus { id, status } => {
                let snapshot = Self::overwrite(state, id, TaskField::Status(status))?;
                (id, snapshot, RemoteCall::UpdateStatus { id, status })
            }
            MutationRequest::ToggleStatus { id } => {
                let status = Self::confirmed_item(state, id)?.status.toggled();
                let snapshot = Self::overwrite(state, id, TaskField::Status(status))?;
                (id, snapshot, RemoteCall::UpdateStatus { id, status })
            }
            MutationRequest::ToggleBookmark { id } => {
                let bookmark = !Self::confirmed_item(state, id)?.bookmark;
                let snapshot = Self::overwrite(state, id, TaskField::Bookmark(bookmark))?;
                (id, snapshot, RemoteCall::UpdateBookmark { id })
            }
            MutationRequest::SetDeadline { id, deadline } => {
                let snapshot = Self::overwrite(state, id, TaskField::Deadline(deadline))?;
                (id, snapshot, RemoteCall::UpdateDeadline { id, deadline })
            }
        };

        let id = MutationId(self.next_mutation);
        self.next_mutation += 1;
        tracing::debug!(mutation = %id, ?kind, %target, "mutation applied optimistically");
        self.pending.insert(
            id,
            PendingMutation {
                id,
                kind,
                target,
                snapshot,
            },
        );
        Ok(Issued {
            id,
            kind,
            target,
            call,
        })
    }

    /// Feed the server's answer for mutation `id`. Success drops the snapshot
    /// (and for a create, swaps the temporary id for the assigned one);
    /// failure restores the snapshot and queues one failure notice on `state`.
    pub fn resolve(
        &mut self,
        state: &mut ListState,
        id: MutationId,
        result: Result<RemoteReply, ApiError>,
    ) -> Resolution {
        let Some(pending) = self.pending.shift_remove(&id) else {
            tracing::warn!(mutation = %id, "response for unknown mutation");
            return Resolution::Unknown(id);
        };

        match result {
            Ok(reply) => {
                let mut target = pending.target;
                if let (Snapshot::Inserted(temp), RemoteReply::Created(assigned)) =
                    (&pending.snapshot, reply)
                {
                    if state.items.rekey(*temp, assigned).is_ok() {
                        if state.selected == Some(*temp) {
                            state.selected = Some(assigned);
                        }
                        target = assigned;
                    }
                }
                tracing::debug!(mutation = %id, kind = ?pending.kind, %target, "mutation committed");
                Resolution::Committed {
                    id,
                    kind: pending.kind,
                    target,
                }
            }
            Err(error) => {
                tracing::warn!(
                    mutation = %id,
                    kind = ?pending.kind,
                    target = %pending.target,
                    error = %error,
                    "mutation failed, rolling back"
                );
                Self::restore(state, pending.snapshot);
                let notice = FailureNotice::new(id, pending.kind, pending.target, &error);
                state.push_failure(notice.clone());
                Resolution::RolledBack(notice)
            }
        }
    }

    fn restore(state: &mut ListState, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Inserted(temp) => {
                let _ = state.items.remove(temp);
                if state.selected == Some(temp) {
                    state.selected = None;
                }
            }
            Snapshot::Removed { item, anchor } => {
                // A refetch may already have brought it back
                if !state.items.contains(item.id) {
                    let at = anchor.slot(state.items.len(), |id| state.items.position(id));
                    let _ = state.items.insert_local(item, at);
                }
            }
            Snapshot::Field {
                id,
                previous,
                applied,
            } => {
                // Leave the field alone if a later mutation has since written it
                let _ = state.items.update(id, |item| {
                    if applied.is_held_by(item) {
                        previous.write_to(item);
                    }
                });
            }
        }
    }

    fn check_confirmed(state: &ListState, id: TaskId) -> Result<(), MutationError> {
        if id.is_temporary() && state.items.contains(id) {
            return Err(MutationError::Unconfirmed(id));
        }
        Ok(())
    }

    fn confirmed_item(state: &ListState, id: TaskId) -> Result<&TaskItem, MutationError> {
        Self::check_confirmed(state, id)?;
        state.items.get(id).ok_or(MutationError::NotFound(id))
    }

    fn overwrite(state: &mut ListState, id: TaskId, value: TaskField) -> Result<Snapshot, MutationError> {
        let previous = value.read_from(Self::confirmed_item(state, id)?);
        state
            .items
            .update(id, |item| value.write_to(item))
            .map_err(|_| MutationError::NotFound(id))?;
        Ok(Snapshot::Field {
            id,
            previous,
            applied: value,
        })
    }
}
