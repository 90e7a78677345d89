//! Drop classification.
//!
//! Resolves a drag payload, the candidate targets under the pointer, and the
//! hitbox instruction into one [`DropOperation`], or a [`Rejection`].
//! Classification only reads the snapshot.

use uuid::Uuid;

use crate::error::Rejection;
use crate::models::{
    CollectionKind, ContainerRef, DragPayload, DragSource, DropLocation, DropTarget, MemberKind,
    Operation, Workspace,
};
use crate::tree::{find_collision, Located};

/// Which side of the target the dragged member lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// The resolved operation for one drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOperation {
    /// Source and target share the same immediate parent.
    ReorderSameContainer {
        source: DragSource,
        target: Uuid,
        placement: Placement,
    },
    /// Source and target have different parents, in the same root or not.
    ReorderCrossContainer {
        source: DragSource,
        target_container: ContainerRef,
        target: Uuid,
        placement: Placement,
    },
    /// Re-parent into an interior member, as its last child.
    CombineIntoInterior {
        source: DragSource,
        target: ContainerRef,
    },
    /// Re-parent directly under a root header, as its last member.
    CombineIntoRoot { source: DragSource, root: Uuid },
    /// Move a root header next to another among the workspace's roots.
    ReorderRoots {
        root: Uuid,
        target: Uuid,
        placement: Placement,
    },
}

impl DropOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReorderSameContainer { .. } => "reorder_same_container",
            Self::ReorderCrossContainer { .. } => "reorder_cross_container",
            Self::CombineIntoInterior { .. } => "combine_into_interior",
            Self::CombineIntoRoot { .. } => "combine_into_root",
            Self::ReorderRoots { .. } => "reorder_roots",
        }
    }
}

/// Classify a drop against the current snapshot.
pub fn classify(
    workspace: &Workspace,
    payload: &DragPayload,
    location: &DropLocation,
) -> Result<DropOperation, Rejection> {
    let candidate = location.innermost().ok_or(Rejection::NoLocation)?;
    let instruction = candidate.instruction.ok_or(Rejection::NoInstruction)?;
    if instruction.blocked {
        return Err(Rejection::Blocked);
    }

    let source = match payload {
        DragPayload::Root(root) => {
            return classify_root(workspace, *root, instruction.operation, candidate.target)
        }
        DragPayload::TreeNode(source)
        | DragPayload::FlatListItem(source)
        | DragPayload::GroupedList(source) => *source,
    };
    let located = workspace
        .locate_in_root(source.container.root, source.member_id)
        .filter(|located| located.container == source.container)
        .ok_or(Rejection::SourceMissing(source.member_id))?;
    check_payload_origin(workspace, payload, &located)?;

    match (instruction.operation, candidate.target) {
        (Operation::Combine, DropTarget::Root { root }) => {
            if matches!(payload, DragPayload::GroupedList(_)) {
                return Err(incompatible(payload, ContainerRef::root(root)));
            }
            if workspace.root(root).is_none() {
                return Err(Rejection::TargetMissing(root));
            }
            let destination = ContainerRef::root(root);
            if destination == located.container {
                return Err(Rejection::AlreadyInContainer);
            }
            check_destination(workspace, payload, &located, destination)?;
            Ok(DropOperation::CombineIntoRoot { source, root })
        }
        (Operation::Combine, DropTarget::Member { container, member_id }) => {
            if matches!(payload, DragPayload::GroupedList(_)) {
                return Err(incompatible(payload, container));
            }
            if member_id == source.member_id {
                return Err(Rejection::SelfTarget);
            }
            let target = locate_target(workspace, container, member_id)?;
            if !target.member.is_interior() {
                return Err(Rejection::NotInterior(member_id));
            }
            let destination = ContainerRef::node(container.root, member_id);
            if destination == located.container {
                return Err(Rejection::AlreadyInContainer);
            }
            check_destination(workspace, payload, &located, destination)?;
            Ok(DropOperation::CombineIntoInterior {
                source,
                target: destination,
            })
        }
        (
            Operation::ReorderBefore | Operation::ReorderAfter,
            DropTarget::Member {
                container,
                member_id,
            },
        ) => {
            if member_id == source.member_id {
                return Err(Rejection::SelfTarget);
            }
            let target = locate_target(workspace, container, member_id)?;
            let placement = placement_of(instruction.operation);

            if target.container == located.container {
                return Ok(DropOperation::ReorderSameContainer {
                    source,
                    target: member_id,
                    placement,
                });
            }

            if matches!(payload, DragPayload::GroupedList(_)) {
                return Err(incompatible(payload, target.container));
            }
            check_destination(workspace, payload, &located, target.container)?;
            Ok(DropOperation::ReorderCrossContainer {
                source,
                target_container: target.container,
                target: member_id,
                placement,
            })
        }
        (Operation::ReorderBefore | Operation::ReorderAfter, DropTarget::Root { root }) => {
            Err(incompatible(payload, ContainerRef::root(root)))
        }
    }
}

/// Root headers only reorder among themselves.
fn classify_root(
    workspace: &Workspace,
    root: Uuid,
    operation: Operation,
    target: DropTarget,
) -> Result<DropOperation, Rejection> {
    if workspace.root(root).is_none() {
        return Err(Rejection::SourceMissing(root));
    }
    let target = match (operation, target) {
        (Operation::ReorderBefore | Operation::ReorderAfter, DropTarget::Root { root: target }) => {
            target
        }
        (_, DropTarget::Root { root: target }) => {
            return Err(Rejection::IncompatibleTarget {
                payload: "root",
                container: ContainerRef::root(target),
            })
        }
        (_, DropTarget::Member { container, .. }) => {
            return Err(Rejection::IncompatibleTarget {
                payload: "root",
                container,
            })
        }
    };
    if target == root {
        return Err(Rejection::SelfTarget);
    }
    if workspace.root(target).is_none() {
        return Err(Rejection::TargetMissing(target));
    }
    Ok(DropOperation::ReorderRoots {
        root,
        target,
        placement: placement_of(operation),
    })
}

fn placement_of(operation: Operation) -> Placement {
    if operation == Operation::ReorderBefore {
        Placement::Before
    } else {
        Placement::After
    }
}

fn incompatible(payload: &DragPayload, container: ContainerRef) -> Rejection {
    Rejection::IncompatibleTarget {
        payload: payload.as_str(),
        container,
    }
}

fn locate_target(
    workspace: &Workspace,
    container: ContainerRef,
    member_id: Uuid,
) -> Result<Located<'_>, Rejection> {
    workspace
        .locate_in_root(container.root, member_id)
        .filter(|located| located.container == container)
        .ok_or(Rejection::TargetMissing(member_id))
}

/// The payload variant must describe what actually sits at the source.
fn check_payload_origin(
    workspace: &Workspace,
    payload: &DragPayload,
    located: &Located<'_>,
) -> Result<(), Rejection> {
    let kind = workspace
        .kind_of(located.container)
        .ok_or(Rejection::SourceMissing(located.member.id))?;
    let fits = match payload {
        DragPayload::TreeNode(_) => kind == CollectionKind::Tree,
        DragPayload::FlatListItem(_) => {
            located.member.kind == MemberKind::Leaf
                && matches!(kind, CollectionKind::FlatList | CollectionKind::GroupedList)
        }
        DragPayload::GroupedList(_) => kind == CollectionKind::GroupedList && located.depth == 0,
        DragPayload::Root(_) => false,
    };
    if fits {
        Ok(())
    } else {
        Err(incompatible(payload, located.container))
    }
}

/// Shape, containment, and naming rules for moving the source into `destination`.
fn check_destination(
    workspace: &Workspace,
    payload: &DragPayload,
    located: &Located<'_>,
    destination: ContainerRef,
) -> Result<(), Rejection> {
    let source = located.member;

    if let Some(node) = destination.node {
        if node == source.id || source.contains(node) {
            return Err(Rejection::Cycle(source.id));
        }
    }

    let kind = workspace
        .kind_of(destination)
        .ok_or(Rejection::TargetMissing(destination.root))?;
    let family_fits = match payload {
        DragPayload::TreeNode(_) => kind == CollectionKind::Tree,
        DragPayload::FlatListItem(_) => {
            matches!(kind, CollectionKind::FlatList | CollectionKind::GroupedList)
        }
        DragPayload::GroupedList(_) | DragPayload::Root(_) => false,
    };
    let depth = workspace
        .depth(destination)
        .ok_or(Rejection::TargetMissing(destination.node.unwrap_or(destination.root)))?;
    if !family_fits || !kind.accepts(depth, source.kind) {
        return Err(incompatible(payload, destination));
    }

    let siblings = workspace
        .container(destination)
        .ok_or(Rejection::NotInterior(destination.node.unwrap_or(destination.root)))?;
    if let Some(existing) = find_collision(siblings, &source.name, Some(source.id)) {
        return Err(Rejection::NameCollision(existing.name.clone()));
    }

    Ok(())
}

/// Rules for creating a member called `name` of `kind` inside `container`.
pub fn check_insert(
    workspace: &Workspace,
    container: ContainerRef,
    name: &str,
    kind: MemberKind,
) -> Result<(), Rejection> {
    if name.trim().is_empty() {
        return Err(Rejection::EmptyName);
    }
    let collection = workspace
        .kind_of(container)
        .ok_or(Rejection::TargetMissing(container.root))?;
    let siblings = workspace
        .container(container)
        .ok_or(Rejection::NotInterior(container.node.unwrap_or(container.root)))?;
    let depth = workspace
        .depth(container)
        .ok_or(Rejection::TargetMissing(container.root))?;
    if !collection.accepts(depth, kind) {
        return Err(Rejection::IncompatibleTarget {
            payload: kind.as_str(),
            container,
        });
    }
    if let Some(existing) = find_collision(siblings, name, None) {
        return Err(Rejection::NameCollision(existing.name.clone()));
    }
    Ok(())
}

/// Rules for renaming member `id` to `name` among its current siblings.
pub fn check_rename(
    workspace: &Workspace,
    id: Uuid,
    name: &str,
) -> Result<ContainerRef, Rejection> {
    if name.trim().is_empty() {
        return Err(Rejection::EmptyName);
    }
    let located = workspace.locate(id).ok_or(Rejection::TargetMissing(id))?;
    let siblings = workspace
        .container(located.container)
        .ok_or(Rejection::TargetMissing(id))?;
    if let Some(existing) = find_collision(siblings, name, Some(id)) {
        return Err(Rejection::NameCollision(existing.name.clone()));
    }
    Ok(located.container)
}
