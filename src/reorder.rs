//! Pure reordering algorithms.
//!
//! Every function reads a snapshot and returns after-states; nothing here
//! performs I/O or mutates its input. The per-slice functions are the
//! algorithms proper; [`rearrange`], [`delete`], [`add`] and [`rename`] resolve
//! containers from a [`Workspace`] and package the results as
//! [`ContainerChange`]s (or a [`RootListChange`]) for the planner.

use uuid::Uuid;

use crate::classify::{DropOperation, Placement};
use crate::error::InvariantViolation;
use crate::models::{ContainerRef, DragSource, Member, MemberKind, NodePath, Root, Workspace};
use crate::order::{self, Ordered};

/// A member that entered a container from somewhere else, in its prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub from: ContainerRef,
    pub member: Member,
}

/// Before and after membership of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerChange {
    pub container: ContainerRef,
    pub before: Vec<Member>,
    pub after: Vec<Member>,
    pub arrivals: Vec<Arrival>,
    /// Ids removed for good: a deleted member and all its descendants.
    pub deleted: Vec<Uuid>,
}

impl ContainerChange {
    fn new(container: ContainerRef, before: &[Member], after: Vec<Member>) -> Self {
        Self {
            container,
            before: before.to_vec(),
            after,
            arrivals: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

/// Before and after order of the workspace's roots, without their members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootListChange {
    pub before: Vec<Root>,
    pub after: Vec<Root>,
}

/// Every container touched by one logical operation, computed from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rearrangement {
    pub changes: Vec<ContainerChange>,
    pub roots: Option<RootListChange>,
}

impl Rearrangement {
    fn containers(changes: Vec<ContainerChange>) -> Self {
        Self {
            changes,
            roots: None,
        }
    }

    /// Whether applying the after-states would change nothing.
    pub fn is_noop(&self) -> bool {
        let members_unchanged = self
            .changes
            .iter()
            .all(|change| change.before == change.after && change.deleted.is_empty());
        let roots_unchanged = self
            .roots
            .as_ref()
            .is_none_or(|roots| roots.before == roots.after);
        members_unchanged && roots_unchanged
    }

    /// Check that every container and root this touches still exists in `workspace`.
    pub fn resolve(&self, workspace: &Workspace) -> Result<(), InvariantViolation> {
        for change in &self.changes {
            members_of(workspace, change.container)?;
        }
        if let Some(roots) = &self.roots {
            for root in &roots.after {
                workspace
                    .root(root.id)
                    .ok_or(InvariantViolation::UnknownRoot(root.id))?;
            }
        }
        Ok(())
    }
}

/// Index at which to insert relative to `target` among siblings that no longer
/// contain the moved member. Equivalent to placing the member at
/// `target.order - 0.5` (before) or `target.order + 0.5` (after) and densifying,
/// including at either boundary.
fn drop_index<T: Ordered>(siblings: &[T], target: Uuid, placement: Placement) -> Option<usize> {
    let position = siblings.iter().position(|item| item.id() == target)?;
    Some(match placement {
        Placement::Before => position,
        Placement::After => position + 1,
    })
}

fn take_member(
    siblings: &[Member],
    id: Uuid,
    container: ContainerRef,
) -> Result<(Member, Vec<Member>), InvariantViolation> {
    let missing = InvariantViolation::MemberMissing {
        member: id,
        container,
    };
    let mut rest = order::sorted(siblings.to_vec());
    let position = rest.iter().position(|member| member.id == id).ok_or(missing)?;
    let member = rest.remove(position);
    Ok((member, rest))
}

/// Move `moved` next to `target` within one container.
pub fn reorder_within(
    container: ContainerRef,
    siblings: &[Member],
    moved: Uuid,
    target: Uuid,
    placement: Placement,
) -> Result<Vec<Member>, InvariantViolation> {
    let (member, rest) = take_member(siblings, moved, container)?;
    let index = drop_index(&rest, target, placement).ok_or(InvariantViolation::MemberMissing {
        member: target,
        container,
    })?;
    Ok(order::insert_at(&rest, member, index))
}

/// Move `moved` out of `source` and next to `target` in another container.
///
/// Returns the source after-state, the target after-state, and the moved
/// member's prior state. The moved subtree is re-pathed under `target_path`.
pub fn move_across(
    source: (ContainerRef, &[Member]),
    target: (ContainerRef, &[Member]),
    moved: Uuid,
    target_id: Uuid,
    placement: Placement,
    target_path: &NodePath,
) -> Result<(Vec<Member>, Vec<Member>, Member), InvariantViolation> {
    let (source_ref, source_members) = source;
    let (target_ref, target_members) = target;

    let (original, _) = take_member(source_members, moved, source_ref)?;
    let source_after = order::remove_and_shift(source_members, moved).ok_or(
        InvariantViolation::MemberMissing {
            member: moved,
            container: source_ref,
        },
    )?;

    let ordered_target = order::sorted(target_members.to_vec());
    let index = drop_index(&ordered_target, target_id, placement).ok_or(
        InvariantViolation::MemberMissing {
            member: target_id,
            container: target_ref,
        },
    )?;
    let target_after = order::insert_at(
        &ordered_target,
        original.clone().rebased(target_path),
        index,
    );

    Ok((source_after, target_after, original))
}

/// Move root `moved` next to `target` among the workspace's roots.
pub fn reorder_roots(
    roots: &[Root],
    moved: Uuid,
    target: Uuid,
    placement: Placement,
) -> Result<Vec<Root>, InvariantViolation> {
    let mut rest = order::sorted(roots.to_vec());
    let position = rest
        .iter()
        .position(|root| root.id == moved)
        .ok_or(InvariantViolation::UnknownRoot(moved))?;
    let root = rest.remove(position);
    let index =
        drop_index(&rest, target, placement).ok_or(InvariantViolation::UnknownRoot(target))?;
    Ok(order::insert_at(&rest, root, index))
}

/// Re-parent `moved` as the last member of another container.
pub fn combine(
    source: (ContainerRef, &[Member]),
    target: &[Member],
    moved: Uuid,
    target_path: &NodePath,
) -> Result<(Vec<Member>, Vec<Member>, Member), InvariantViolation> {
    let (source_ref, source_members) = source;
    let (original, _) = take_member(source_members, moved, source_ref)?;
    let source_after = order::remove_and_shift(source_members, moved).ok_or(
        InvariantViolation::MemberMissing {
            member: moved,
            container: source_ref,
        },
    )?;
    let target_after = order::append(target, original.clone().rebased(target_path));
    Ok((source_after, target_after, original))
}

/// Remove `removed` (and, implicitly, its subtree) from its siblings.
///
/// Returns the after-state and the removed member as it was.
pub fn remove(
    container: ContainerRef,
    siblings: &[Member],
    removed: Uuid,
) -> Result<(Vec<Member>, Member), InvariantViolation> {
    let (original, _) = take_member(siblings, removed, container)?;
    let after = order::remove_and_shift(siblings, removed).ok_or(
        InvariantViolation::MemberMissing {
            member: removed,
            container,
        },
    )?;
    Ok((after, original))
}

/// Compute the after-state of a classified drop.
pub fn rearrange(
    workspace: &Workspace,
    operation: &DropOperation,
) -> Result<Rearrangement, InvariantViolation> {
    let changes = match *operation {
        DropOperation::ReorderRoots {
            root,
            target,
            placement,
        } => {
            let before: Vec<Root> = workspace.roots.iter().map(Root::shallow).collect();
            let after = reorder_roots(&before, root, target, placement)?;
            return Ok(Rearrangement {
                changes: Vec::new(),
                roots: Some(RootListChange { before, after }),
            });
        }
        DropOperation::ReorderSameContainer {
            source,
            target,
            placement,
        } => {
            let source_members = members_of(workspace, source.container)?;
            let after = reorder_within(
                source.container,
                source_members,
                source.member_id,
                target,
                placement,
            )?;
            vec![ContainerChange::new(source.container, source_members, after)]
        }
        DropOperation::ReorderCrossContainer {
            source,
            target_container,
            target,
            placement,
        } => {
            let source_members = members_of(workspace, source.container)?;
            let target_members = members_of(workspace, target_container)?;
            let target_path = path_of(workspace, target_container)?;
            let (source_after, target_after, original) = move_across(
                (source.container, source_members),
                (target_container, target_members),
                source.member_id,
                target,
                placement,
                &target_path,
            )?;
            cross_changes(
                source.container,
                source_members,
                source_after,
                target_container,
                target_members,
                target_after,
                original,
            )
        }
        DropOperation::CombineIntoInterior { source, target } => {
            combine_changes(workspace, source, target)?
        }
        DropOperation::CombineIntoRoot { source, root } => {
            combine_changes(workspace, source, ContainerRef::root(root))?
        }
    };

    Ok(Rearrangement::containers(changes))
}

fn combine_changes(
    workspace: &Workspace,
    source: DragSource,
    target: ContainerRef,
) -> Result<Vec<ContainerChange>, InvariantViolation> {
    let source_members = members_of(workspace, source.container)?;
    let target_members = members_of(workspace, target)?;
    let target_path = path_of(workspace, target)?;
    let (source_after, target_after, original) = combine(
        (source.container, source_members),
        target_members,
        source.member_id,
        &target_path,
    )?;
    Ok(cross_changes(
        source.container,
        source_members,
        source_after,
        target,
        target_members,
        target_after,
        original,
    ))
}

fn cross_changes(
    source: ContainerRef,
    source_before: &[Member],
    source_after: Vec<Member>,
    target: ContainerRef,
    target_before: &[Member],
    target_after: Vec<Member>,
    original: Member,
) -> Vec<ContainerChange> {
    let mut target_change = ContainerChange::new(target, target_before, target_after);
    target_change.arrivals.push(Arrival {
        from: source,
        member: original,
    });
    vec![
        ContainerChange::new(source, source_before, source_after),
        target_change,
    ]
}

/// Cascade-delete member `id`: it and every descendant go, and only the
/// siblings after it shift down.
pub fn delete(workspace: &Workspace, id: Uuid) -> Result<Rearrangement, InvariantViolation> {
    let located = workspace
        .locate(id)
        .ok_or(InvariantViolation::UnknownMember(id))?;
    let siblings = members_of(workspace, located.container)?;
    let (after, removed) = remove(located.container, siblings, id)?;

    let mut change = ContainerChange::new(located.container, siblings, after);
    change.deleted = removed.subtree().iter().map(|member| member.id).collect();
    Ok(Rearrangement::containers(vec![change]))
}

/// Append a new member called `name` to `container`.
///
/// Returns the rearrangement and the id minted for the new member.
pub fn add(
    workspace: &Workspace,
    container: ContainerRef,
    name: &str,
    kind: MemberKind,
) -> Result<(Rearrangement, Uuid), InvariantViolation> {
    let siblings = members_of(workspace, container)?;
    let parent_path = path_of(workspace, container)?;
    let member = match kind {
        MemberKind::Leaf => Member::leaf(name, 0, &parent_path),
        MemberKind::Interior => Member::interior(name, 0, &parent_path),
    };
    let id = member.id;
    let after = order::append(siblings, member);
    Ok((
        Rearrangement::containers(vec![ContainerChange::new(container, siblings, after)]),
        id,
    ))
}

/// Rename member `id`, re-deriving the path of its whole subtree.
pub fn rename(
    workspace: &Workspace,
    id: Uuid,
    name: &str,
) -> Result<Rearrangement, InvariantViolation> {
    let located = workspace
        .locate(id)
        .ok_or(InvariantViolation::UnknownMember(id))?;
    let siblings = members_of(workspace, located.container)?;
    let parent_path = path_of(workspace, located.container)?;

    let after = siblings
        .iter()
        .map(|member| {
            if member.id == id {
                let mut renamed = member.clone();
                renamed.name = name.to_string();
                renamed.rebased(&parent_path)
            } else {
                member.clone()
            }
        })
        .collect();

    Ok(Rearrangement::containers(vec![ContainerChange::new(
        located.container,
        siblings,
        after,
    )]))
}

fn members_of(
    workspace: &Workspace,
    container: ContainerRef,
) -> Result<&[Member], InvariantViolation> {
    workspace
        .container(container)
        .ok_or(InvariantViolation::UnknownContainer(container))
}

fn path_of(workspace: &Workspace, container: ContainerRef) -> Result<NodePath, InvariantViolation> {
    workspace
        .container_path(container)
        .ok_or(InvariantViolation::UnknownContainer(container))
}
