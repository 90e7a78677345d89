//! Reconciliation driver.
//!
//! Runs one drop through `Idle → Classifying → {Rejected | Computing} →
//! Committing → {Committed | Failed}` and back to `Idle`. Classification and
//! computation are synchronous against the cached snapshot; dispatching the
//! batches to the [`CommitBackend`] is the only await point. Every affected
//! container is resolved before anything is dispatched, and the cache is
//! patched with the computed after-state only once every batch has committed.

use std::future::Future;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::classify::{check_insert, check_rename, classify};
use crate::error::{CommitError, InvariantViolation, ReconcileError};
use crate::models::{
    Batch, ContainerRef, DragPayload, DropLocation, Member, MemberKind, Root, RootBatch, Workspace,
};
use crate::planner::{plan_all, plan_roots};
use crate::reorder::{self, Rearrangement};

/// The persistence capability batches are committed to.
///
/// Each call is independent; the driver awaits every batch of one operation
/// before deciding the outcome.
pub trait CommitBackend {
    fn commit_batch(&self, batch: &Batch) -> impl Future<Output = Result<(), CommitError>> + Send;

    /// Persist new root positions as one unit.
    fn commit_root_batch(
        &self,
        batch: &RootBatch,
    ) -> impl Future<Output = Result<(), CommitError>> + Send;
}

/// Snapshot provider and cache patch surface.
pub trait SnapshotCache {
    fn snapshot(&self) -> &Workspace;

    /// Replace `container`'s membership with a computed after-state.
    fn apply_computed_state(
        &mut self,
        container: ContainerRef,
        after: &[Member],
    ) -> Result<(), InvariantViolation>;

    /// Reorder the roots to a computed after-state.
    fn apply_root_order(&mut self, after: &[Root]) -> Result<(), InvariantViolation>;
}

impl SnapshotCache for Workspace {
    fn snapshot(&self) -> &Workspace {
        self
    }

    fn apply_computed_state(
        &mut self,
        container: ContainerRef,
        after: &[Member],
    ) -> Result<(), InvariantViolation> {
        self.apply_container(container, after)
    }

    fn apply_root_order(&mut self, after: &[Root]) -> Result<(), InvariantViolation> {
        Workspace::apply_root_order(self, after)
    }
}

/// Where a drop is in its lifecycle.
///
/// - `Idle`: no drop in progress
/// - `Classifying`: resolving the drop against the snapshot
/// - `Rejected`: classification refused the drop; nothing was written
/// - `Computing`: running the algorithm and the planner
/// - `Committing`: waiting on the commit capability
/// - `Committed`: every batch committed and the cache was patched
/// - `Failed`: computation aborted or a batch failed; the cache is untouched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropState {
    Idle,
    Classifying,
    Rejected,
    Computing,
    Committing,
    Committed,
    Failed,
}

impl DropState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Classifying => "classifying",
            Self::Rejected => "rejected",
            Self::Computing => "computing",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Committed | Self::Failed)
    }
}

/// One drag gesture, from pick-up to drop or cancel.
///
/// Owned by the caller and passed explicitly to [`Reconciler::handle_drop`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragSession {
    pub id: Uuid,
    pub payload: DragPayload,
    pub started_at: DateTime<Utc>,
    state: DropState,
    history: Vec<DropState>,
}

impl DragSession {
    pub fn start(payload: DragPayload) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            payload,
            started_at: Utc::now(),
            state: DropState::Idle,
            history: vec![DropState::Idle],
        };
        debug!(session = %session.id, payload = payload.as_str(), "drag started");
        session
    }

    pub fn state(&self) -> DropState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[DropState] {
        &self.history
    }

    /// The last terminal state reached, if any.
    pub fn outcome(&self) -> Option<DropState> {
        self.history.iter().rev().copied().find(DropState::is_terminal)
    }

    /// Abandon the drag without dropping. Nothing is written.
    pub fn cancel(&mut self) {
        debug!(session = %self.id, "drag cancelled");
        self.transition(DropState::Idle);
    }

    fn transition(&mut self, next: DropState) {
        debug!(
            session = %self.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "drop state"
        );
        self.state = next;
        self.history.push(next);
    }

    fn finish(&mut self, terminal: DropState) {
        self.transition(terminal);
        self.transition(DropState::Idle);
    }
}

/// A structural edit that is not a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Add {
        container: ContainerRef,
        name: String,
        kind: MemberKind,
    },
    Rename {
        id: Uuid,
        name: String,
    },
    Delete {
        id: Uuid,
    },
}

impl Edit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Rename { .. } => "rename",
            Self::Delete { .. } => "delete",
        }
    }
}

/// What a successful reconciliation committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Non-empty batches, one per affected container.
    pub batches: Vec<Batch>,
    /// New root positions, when roots were reordered.
    pub root_batch: Option<RootBatch>,
    /// Id of the member an [`Edit::Add`] created.
    pub created: Option<Uuid>,
}

impl Reconciled {
    pub fn is_noop(&self) -> bool {
        self.batches.is_empty() && self.root_batch.is_none()
    }

    pub fn command_count(&self) -> usize {
        let members: usize = self.batches.iter().map(Batch::len).sum();
        members + self.root_batch.as_ref().map_or(0, RootBatch::len)
    }
}

pub struct Reconciler<B> {
    backend: B,
}

impl<B: CommitBackend> Reconciler<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Classify, compute, plan, commit, and patch the cache for one drop.
    pub async fn handle_drop<C: SnapshotCache>(
        &self,
        session: &mut DragSession,
        cache: &mut C,
        location: &DropLocation,
    ) -> Result<Reconciled, ReconcileError> {
        session.transition(DropState::Classifying);
        let operation = match classify(cache.snapshot(), &session.payload, location) {
            Ok(operation) => operation,
            Err(rejection) => {
                warn!(session = %session.id, reason = %rejection, "drop rejected");
                session.finish(DropState::Rejected);
                return Err(rejection.into());
            }
        };

        session.transition(DropState::Computing);
        let computed = reorder::rearrange(cache.snapshot(), &operation).and_then(|rearrangement| {
            rearrangement
                .resolve(cache.snapshot())
                .map(|()| rearrangement)
        });
        let rearrangement = match computed {
            Ok(rearrangement) => rearrangement,
            Err(violation) => {
                warn!(
                    session = %session.id,
                    operation = operation.as_str(),
                    error = %violation,
                    "drop aborted"
                );
                session.finish(DropState::Failed);
                return Err(violation.into());
            }
        };

        session.transition(DropState::Committing);
        match self.commit(cache, &rearrangement).await {
            Ok(outcome) => {
                info!(
                    session = %session.id,
                    operation = operation.as_str(),
                    commands = outcome.command_count(),
                    "drop committed"
                );
                session.finish(DropState::Committed);
                Ok(outcome)
            }
            Err(err) => {
                session.finish(DropState::Failed);
                Err(err)
            }
        }
    }

    /// Run an add, rename, or delete through the same compute/commit path.
    pub async fn edit<C: SnapshotCache>(
        &self,
        cache: &mut C,
        edit: Edit,
    ) -> Result<Reconciled, ReconcileError> {
        let snapshot = cache.snapshot();
        let computed = match &edit {
            Edit::Add {
                container,
                name,
                kind,
            } => {
                check_insert(snapshot, *container, name, *kind).inspect_err(|rejection| {
                    warn!(edit = edit.as_str(), reason = %rejection, "edit rejected")
                })?;
                reorder::add(snapshot, *container, name, *kind)
                    .map(|(rearrangement, id)| (rearrangement, Some(id)))
            }
            Edit::Rename { id, name } => {
                check_rename(snapshot, *id, name).inspect_err(|rejection| {
                    warn!(edit = edit.as_str(), reason = %rejection, "edit rejected")
                })?;
                reorder::rename(snapshot, *id, name).map(|rearrangement| (rearrangement, None))
            }
            Edit::Delete { id } => {
                reorder::delete(snapshot, *id).map(|rearrangement| (rearrangement, None))
            }
        };
        let (rearrangement, created) = computed
            .and_then(|(rearrangement, created)| {
                rearrangement
                    .resolve(snapshot)
                    .map(|()| (rearrangement, created))
            })
            .inspect_err(|violation| {
                warn!(edit = edit.as_str(), error = %violation, "edit aborted")
            })?;

        let outcome = self.commit(cache, &rearrangement).await?;
        info!(
            edit = edit.as_str(),
            commands = outcome.command_count(),
            "edit committed"
        );
        Ok(Reconciled { created, ..outcome })
    }

    async fn commit<C: SnapshotCache>(
        &self,
        cache: &mut C,
        rearrangement: &Rearrangement,
    ) -> Result<Reconciled, ReconcileError> {
        let batches: Vec<Batch> = plan_all(rearrangement)
            .into_iter()
            .filter(|batch| !batch.is_empty())
            .collect();
        let root_batch = rearrangement
            .roots
            .as_ref()
            .map(plan_roots)
            .filter(|batch| !batch.is_empty());

        if batches.is_empty() && root_batch.is_none() {
            debug!("nothing to commit");
            return Ok(Reconciled::default());
        }

        if let Some(root_batch) = &root_batch {
            self.backend
                .commit_root_batch(root_batch)
                .await
                .map_err(|err| {
                    error!(error = %err, "root order commit failed");
                    ReconcileError::RootOrderFailed(err)
                })?;
        }

        let results = join_all(
            batches
                .iter()
                .map(|batch| self.backend.commit_batch(batch)),
        )
        .await;

        let failures: Vec<(ContainerRef, CommitError)> = batches
            .iter()
            .zip(results)
            .filter_map(|(batch, result)| result.err().map(|err| (batch.container, err)))
            .collect();

        if !failures.is_empty() {
            for (container, err) in &failures {
                error!(container = %container, error = %err, "batch commit failed");
            }
            return Err(ReconcileError::CommitFailed {
                attempted: batches.len(),
                failures,
            });
        }

        // Batches are persisted; a failed patch only leaves the cache stale
        for change in &rearrangement.changes {
            if let Err(violation) = cache.apply_computed_state(change.container, &change.after) {
                error!(
                    container = %change.container,
                    error = %violation,
                    "cache patch failed after commit"
                );
            }
        }
        if let Some(roots) = &rearrangement.roots {
            if let Err(violation) = cache.apply_root_order(&roots.after) {
                error!(error = %violation, "root order patch failed after commit");
            }
        }

        Ok(Reconciled {
            batches,
            root_batch,
            created: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionKind, DragSource, NodePath, Root};

    #[test]
    fn test_terminal_states() {
        assert!(DropState::Committed.is_terminal());
        assert!(DropState::Rejected.is_terminal());
        assert!(!DropState::Committing.is_terminal());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let root = Root::new("P", CollectionKind::Tree)
            .with_members(vec![Member::leaf("a", 1, &NodePath::root())]);
        let mut session = DragSession::start(DragPayload::TreeNode(DragSource {
            container: root.container_ref(),
            member_id: root.members[0].id,
        }));
        session.cancel();
        assert_eq!(session.state(), DropState::Idle);
        assert_eq!(session.outcome(), None);
    }
}
