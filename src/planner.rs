//! Batch update planner.
//!
//! Diffs the before and after state of one container and emits only what
//! changed: one [`Batch`] per container, so a cross-container move yields two
//! independently dispatchable batches. Reordered roots get a [`RootBatch`] of
//! their own.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{Batch, ContainerRef, Member, NewMember, RootBatch, RootUpdate, UpdateCommand};
use crate::reorder::{ContainerChange, Rearrangement, RootListChange};

/// Prior state of one member: where it lived and its own fields.
struct Prior<'a> {
    parent: ContainerRef,
    member: &'a Member,
}

fn collect_prior<'a>(
    members: &'a [Member],
    parent: ContainerRef,
    into: &mut HashMap<Uuid, Prior<'a>>,
) {
    for member in members {
        into.insert(member.id, Prior { parent, member });
        collect_prior(
            &member.children,
            ContainerRef::node(parent.root, member.id),
            into,
        );
    }
}

/// Plan the batch for one container change.
pub fn plan(change: &ContainerChange) -> Batch {
    let mut prior = HashMap::new();
    collect_prior(&change.before, change.container, &mut prior);
    for arrival in &change.arrivals {
        collect_prior(std::slice::from_ref(&arrival.member), arrival.from, &mut prior);
    }

    let mut batch = Batch::new(change.container);
    diff_members(&change.after, change.container, &prior, &mut batch);
    batch.deletes = change.deleted.clone();
    batch
}

/// Plan every container of a rearrangement, in the same order.
pub fn plan_all(rearrangement: &Rearrangement) -> Vec<Batch> {
    rearrangement.changes.iter().map(plan).collect()
}

/// Plan the order updates of a root reorder: only roots whose position changed.
pub fn plan_roots(change: &RootListChange) -> RootBatch {
    let prior: HashMap<Uuid, u32> = change
        .before
        .iter()
        .map(|root| (root.id, root.order))
        .collect();
    let updates = change
        .after
        .iter()
        .filter(|root| prior.get(&root.id) != Some(&root.order))
        .map(|root| RootUpdate {
            id: root.id,
            order: root.order,
        })
        .collect();
    RootBatch { updates }
}

fn diff_members(
    after: &[Member],
    parent: ContainerRef,
    prior: &HashMap<Uuid, Prior<'_>>,
    batch: &mut Batch,
) {
    for member in after {
        match prior.get(&member.id) {
            None => batch.creates.push(NewMember {
                id: member.id,
                parent,
                name: member.name.clone(),
                kind: member.kind,
                order: member.order,
                path: member.path.clone(),
            }),
            Some(before) => {
                let update = diff_one(before, member, parent);
                if !update.is_empty() {
                    batch.updates.push(update);
                }
            }
        }
        diff_members(
            &member.children,
            ContainerRef::node(parent.root, member.id),
            prior,
            batch,
        );
    }
}

fn diff_one(before: &Prior<'_>, after: &Member, parent: ContainerRef) -> UpdateCommand {
    let mut update = UpdateCommand::new(after.id);
    if before.member.order != after.order {
        update.order = Some(after.order);
    }
    if before.parent != parent {
        update.parent = Some(parent);
    }
    if before.member.path != after.path {
        update.path = Some(after.path.clone());
    }
    if before.member.name != after.name {
        update.name = Some(after.name.clone());
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodePath;
    use crate::reorder::Arrival;

    fn leaf(name: &str, order: u32) -> Member {
        Member::leaf(name, order, &NodePath::root())
    }

    #[test]
    fn test_unchanged_members_emit_nothing() {
        let container = ContainerRef::root(Uuid::new_v4());
        let members = vec![leaf("a", 1), leaf("b", 2)];
        let change = ContainerChange {
            container,
            before: members.clone(),
            after: members,
            arrivals: vec![],
            deleted: vec![],
        };
        let batch = plan(&change);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_only_changed_fields_are_set() {
        let container = ContainerRef::root(Uuid::new_v4());
        let before = vec![leaf("a", 1), leaf("b", 2), leaf("c", 3)];
        let mut after = before.clone();
        after.swap(0, 1);
        after[0].order = 1;
        after[1].order = 2;

        let batch = plan(&ContainerChange {
            container,
            before: before.clone(),
            after,
            arrivals: vec![],
            deleted: vec![],
        });

        assert_eq!(batch.updates.len(), 2);
        let moved = batch.update_for(before[0].id).unwrap();
        assert_eq!(moved.order, Some(2));
        assert!(moved.parent.is_none() && moved.path.is_none() && moved.name.is_none());
        assert!(batch.update_for(before[2].id).is_none());
    }

    #[test]
    fn test_arrival_subtree_gets_parent_and_path() {
        let from_root = Uuid::new_v4();
        let to_root = Uuid::new_v4();
        let top = NodePath::root();
        let dir = Member::interior("auth", 1, &top)
            .with_children(vec![Member::leaf("login", 1, &top)]);
        let child_id = dir.children[0].id;
        let target = ContainerRef::root(to_root);
        let mut arrived = dir.clone();
        arrived.order = 2;
        let after = vec![leaf("x", 1), arrived];

        let batch = plan(&ContainerChange {
            container: target,
            before: vec![after[0].clone()],
            after: after.clone(),
            arrivals: vec![Arrival {
                from: ContainerRef::root(from_root),
                member: dir.clone(),
            }],
            deleted: vec![],
        });

        let moved = batch.update_for(dir.id).unwrap();
        assert_eq!(moved.order, Some(2));
        assert_eq!(moved.parent, Some(target));
        assert!(moved.path.is_none(), "path unchanged between top levels");

        let child = batch.update_for(child_id).unwrap();
        assert_eq!(child.parent, Some(ContainerRef::node(to_root, dir.id)));
        assert!(child.order.is_none());
        assert!(batch.creates.is_empty());
    }

    #[test]
    fn test_unknown_members_become_creates_and_deletes_pass_through() {
        let container = ContainerRef::root(Uuid::new_v4());
        let existing = leaf("a", 1);
        let gone = Uuid::new_v4();
        let fresh = leaf("b", 2);
        let batch = plan(&ContainerChange {
            container,
            before: vec![existing.clone()],
            after: vec![existing, fresh.clone()],
            arrivals: vec![],
            deleted: vec![gone],
        });
        assert_eq!(batch.creates.len(), 1);
        assert_eq!(batch.creates[0].id, fresh.id);
        assert_eq!(batch.creates[0].parent, container);
        assert_eq!(batch.deletes, vec![gone]);
        assert!(batch.updates.is_empty());
    }

    #[test]
    fn test_root_plan_skips_unmoved_roots() {
        use crate::models::{CollectionKind, Root};

        let before = crate::order::renumber(vec![
            Root::new("a", CollectionKind::Tree),
            Root::new("b", CollectionKind::Tree),
            Root::new("c", CollectionKind::Tree),
        ]);
        let mut after = before.clone();
        after.swap(0, 1);
        after[0].order = 1;
        after[1].order = 2;

        let batch = plan_roots(&RootListChange {
            before: before.clone(),
            after,
        });
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.update_for(before[0].id).unwrap().order, 2);
        assert_eq!(batch.update_for(before[1].id).unwrap().order, 1);
        assert!(batch.update_for(before[2].id).is_none());
    }
}
