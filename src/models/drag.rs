use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContainerRef;

/// The raw position instruction reported by the drag-and-drop hitbox.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    ReorderBefore,
    ReorderAfter,
    Combine,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReorderBefore => "reorder-before",
            Self::ReorderAfter => "reorder-after",
            Self::Combine => "combine",
        }
    }
}

/// An operation plus the hitbox's verdict on whether it is allowed at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropInstruction {
    pub operation: Operation,
    #[serde(default)]
    pub blocked: bool,
}

impl DropInstruction {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            blocked: false,
        }
    }

    pub fn blocked(operation: Operation) -> Self {
        Self {
            operation,
            blocked: true,
        }
    }
}

/// Where a dragged member claims to come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DragSource {
    /// The member's immediate parent container (its root is the owning root).
    pub container: ContainerRef,
    pub member_id: Uuid,
}

/// What is being dragged. Each variant only lands on targets of its own family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "source", rename_all = "snake_case")]
pub enum DragPayload {
    /// A resource (file or directory) of a project tree.
    TreeNode(DragSource),
    /// An environment, global or inside a project group.
    FlatListItem(DragSource),
    /// A whole project environment group.
    GroupedList(DragSource),
    /// A root header, reordered among the workspace's roots.
    Root(Uuid),
}

impl DragPayload {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TreeNode(_) => "tree_node",
            Self::FlatListItem(_) => "flat_list_item",
            Self::GroupedList(_) => "grouped_list",
            Self::Root(_) => "root",
        }
    }
}

/// Something a drag can be released over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropTarget {
    /// A member row, living in `container`.
    Member { container: ContainerRef, member_id: Uuid },
    /// A root header (tree header or list header).
    Root { root: Uuid },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropCandidate {
    pub target: DropTarget,
    pub instruction: Option<DropInstruction>,
}

/// Drop-target candidates under the pointer, innermost first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropLocation {
    pub candidates: Vec<DropCandidate>,
}

impl DropLocation {
    pub fn new(candidates: Vec<DropCandidate>) -> Self {
        Self { candidates }
    }

    pub fn single(target: DropTarget, instruction: DropInstruction) -> Self {
        Self::new(vec![DropCandidate {
            target,
            instruction: Some(instruction),
        }])
    }

    /// Released outside any target.
    pub fn nowhere() -> Self {
        Self::default()
    }

    pub fn innermost(&self) -> Option<&DropCandidate> {
        self.candidates.first()
    }
}
