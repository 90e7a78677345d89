//! Error types for classification, computation, and commit.

use thiserror::Error;
use uuid::Uuid;

use crate::models::ContainerRef;

/// Why a drop (or an edit) was refused before anything was computed.
///
/// Rejections never mutate state and never reach the commit capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("drop instruction is blocked")]
    Blocked,
    #[error("no drop target under the pointer")]
    NoLocation,
    #[error("drop target carries no instruction")]
    NoInstruction,
    #[error("dragged member {0} is not in its claimed container")]
    SourceMissing(Uuid),
    #[error("drop target {0} not found")]
    TargetMissing(Uuid),
    #[error("member cannot be dropped relative to itself")]
    SelfTarget,
    #[error("target container already has a member named {0:?}")]
    NameCollision(String),
    #[error("member {0} cannot be moved into its own subtree")]
    Cycle(Uuid),
    #[error("target {0} cannot own children")]
    NotInterior(Uuid),
    #[error("member is already a direct child of the target")]
    AlreadyInContainer,
    #[error("{payload} cannot be placed in {container}")]
    IncompatibleTarget {
        payload: &'static str,
        container: ContainerRef,
    },
    #[error("member name must not be empty")]
    EmptyName,
}

/// A precondition the pure algorithms rely on does not hold in the snapshot.
///
/// Treated as a recoverable no-op: the operation aborts before any command is emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("container {0} not found in snapshot")]
    UnknownContainer(ContainerRef),
    #[error("member {member} not found in container {container}")]
    MemberMissing { member: Uuid, container: ContainerRef },
    #[error("member {0} not found in snapshot")]
    UnknownMember(Uuid),
    #[error("root {0} not found in snapshot")]
    UnknownRoot(Uuid),
}

/// The commit capability refused or failed a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("commit rejected: {0}")]
    Rejected(String),
    #[error("commit timed out")]
    TimedOut,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Outcome error of one reconciliation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("{} of {attempted} batches failed to commit", .failures.len())]
    CommitFailed {
        attempted: usize,
        failures: Vec<(ContainerRef, CommitError)>,
    },
    #[error("root order failed to commit: {0}")]
    RootOrderFailed(CommitError),
}
