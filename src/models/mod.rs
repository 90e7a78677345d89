//! Domain models for arrange.
//!
//! # Core Concepts
//!
//! - [`Root`]: a top-level collection (project tree, global environment list,
//!   or project environment groups), shaped by its [`CollectionKind`].
//! - [`Member`]: an orderable entry with a name, a dense sibling `order`, and,
//!   when [`MemberKind::Interior`], children of its own.
//! - [`ContainerRef`]: a root or an interior member, i.e. anything that owns an
//!   ordered member list.
//! - [`Workspace`]: the snapshot of every root, read synchronously while a drop
//!   is classified and computed.
//!
//! ## Drag and drop
//!
//! - [`DragPayload`]: what is being dragged (a member or a root header), as a
//!   closed set of variants.
//! - [`DropLocation`]: the candidate targets under the pointer with their
//!   [`DropInstruction`].
//!
//! ## Persistence
//!
//! - [`Batch`]: per-container creates, partial updates, and deletes handed to
//!   the commit capability.
//! - [`RootBatch`]: new positions for reordered roots.

mod collection;
mod command;
mod drag;
mod member;

pub use collection::*;
pub use command::*;
pub use drag::*;
pub use member::*;
