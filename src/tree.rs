//! Lookups, ancestry, and cache patching over a [`Workspace`] snapshot.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::error::InvariantViolation;
use crate::models::{CollectionKind, ContainerRef, Member, NodePath, Root, Workspace};
use crate::order;

/// A member found in the snapshot, with where it lives.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub member: &'a Member,
    /// The member's immediate parent container.
    pub container: ContainerRef,
    /// 0 for members directly under a root.
    pub depth: usize,
}

impl Workspace {
    pub fn root(&self, id: Uuid) -> Option<&Root> {
        self.roots.iter().find(|root| root.id == id)
    }

    pub fn root_mut(&mut self, id: Uuid) -> Option<&mut Root> {
        self.roots.iter_mut().find(|root| root.id == id)
    }

    /// Find a member anywhere in the workspace.
    pub fn locate(&self, id: Uuid) -> Option<Located<'_>> {
        self.roots
            .iter()
            .find_map(|root| locate_in(&root.members, id, ContainerRef::root(root.id), 0))
    }

    /// Find a member within one root.
    pub fn locate_in_root(&self, root: Uuid, id: Uuid) -> Option<Located<'_>> {
        let root = self.root(root)?;
        locate_in(&root.members, id, ContainerRef::root(root.id), 0)
    }

    /// The ordered member list owned by `container`.
    ///
    /// Returns `None` if the container does not exist or is a leaf.
    pub fn container(&self, container: ContainerRef) -> Option<&[Member]> {
        let root = self.root(container.root)?;
        match container.node {
            None => Some(&root.members),
            Some(node) => {
                let located = locate_in(&root.members, node, root.container_ref(), 0)?;
                located
                    .member
                    .is_interior()
                    .then_some(located.member.children.as_slice())
            }
        }
    }

    pub fn container_mut(&mut self, container: ContainerRef) -> Option<&mut Vec<Member>> {
        let root = self.root_mut(container.root)?;
        match container.node {
            None => Some(&mut root.members),
            Some(node) => {
                let member = find_mut(&mut root.members, node)?;
                if member.is_interior() {
                    Some(&mut member.children)
                } else {
                    None
                }
            }
        }
    }

    /// Path of the container itself: empty for a root, the member's path otherwise.
    pub fn container_path(&self, container: ContainerRef) -> Option<NodePath> {
        match container.node {
            None => self.root(container.root).map(|_| NodePath::root()),
            Some(node) => self
                .locate_in_root(container.root, node)
                .map(|located| located.member.path.clone()),
        }
    }

    /// Depth at which members of `container` live.
    pub fn depth(&self, container: ContainerRef) -> Option<usize> {
        match container.node {
            None => self.root(container.root).map(|_| 0),
            Some(node) => self
                .locate_in_root(container.root, node)
                .map(|located| located.depth + 1),
        }
    }

    pub fn kind_of(&self, container: ContainerRef) -> Option<CollectionKind> {
        self.root(container.root).map(|root| root.kind)
    }

    /// Replace the member list of `container` with a computed after-state.
    ///
    /// Only the container's direct membership is taken from `after`. Members that
    /// were already present keep their current children (re-pathed under their
    /// possibly renamed parent); newcomers bring their whole subtree. This keeps
    /// patches order-independent when one affected container is nested inside
    /// another.
    pub fn apply_container(
        &mut self,
        container: ContainerRef,
        after: &[Member],
    ) -> Result<(), InvariantViolation> {
        let current = self
            .container_mut(container)
            .ok_or(InvariantViolation::UnknownContainer(container))?;

        let mut previous: HashMap<Uuid, Member> = std::mem::take(current)
            .into_iter()
            .map(|member| (member.id, member))
            .collect();

        *current = after
            .iter()
            .map(|member| match previous.remove(&member.id) {
                Some(existing) => {
                    let mut patched = member.shallow();
                    patched.children = existing
                        .children
                        .into_iter()
                        .map(|child| child.rebased(&patched.path))
                        .collect();
                    patched
                }
                None => member.clone(),
            })
            .collect();

        Ok(())
    }

    /// Reorder the roots to match `after`, keeping each root's members.
    pub fn apply_root_order(&mut self, after: &[Root]) -> Result<(), InvariantViolation> {
        if let Some(missing) = after.iter().find(|slot| self.root(slot.id).is_none()) {
            return Err(InvariantViolation::UnknownRoot(missing.id));
        }

        let mut previous: HashMap<Uuid, Root> = std::mem::take(&mut self.roots)
            .into_iter()
            .map(|root| (root.id, root))
            .collect();
        let mut roots: Vec<Root> = after
            .iter()
            .filter_map(|slot| {
                previous.remove(&slot.id).map(|mut root| {
                    root.order = slot.order;
                    root
                })
            })
            .collect();
        // Roots missing from `after` keep their relative order at the end
        roots.extend(order::sorted(previous.into_values().collect::<Vec<Root>>()));
        self.roots = roots;
        Ok(())
    }
}

fn locate_in(
    members: &[Member],
    id: Uuid,
    container: ContainerRef,
    depth: usize,
) -> Option<Located<'_>> {
    for member in members {
        if member.id == id {
            return Some(Located {
                member,
                container,
                depth,
            });
        }
        let inner = ContainerRef::node(container.root, member.id);
        if let Some(found) = locate_in(&member.children, id, inner, depth + 1) {
            return Some(found);
        }
    }
    None
}

fn find_mut(members: &mut [Member], id: Uuid) -> Option<&mut Member> {
    for member in members.iter_mut() {
        if member.id == id {
            return Some(member);
        }
        if let Some(found) = find_mut(&mut member.children, id) {
            return Some(found);
        }
    }
    None
}

/// First sibling (other than `except`) whose name collides with `name`.
pub fn find_collision<'a>(
    siblings: &'a [Member],
    name: &str,
    except: Option<Uuid>,
) -> Option<&'a Member> {
    siblings
        .iter()
        .find(|sibling| Some(sibling.id) != except && sibling.name_matches(name))
}

/// A broken invariant found by [`validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("orders in {container} are not 1..N: {orders:?}")]
    NotDense {
        container: ContainerRef,
        orders: Vec<u32>,
    },
    #[error("{container} has more than one member named {name:?}")]
    DuplicateName { container: ContainerRef, name: String },
    #[error("member {id} has path {actual} but should have {expected}")]
    PathMismatch {
        id: Uuid,
        expected: NodePath,
        actual: NodePath,
    },
    #[error("member {id} does not fit the shape of {container}")]
    ShapeMismatch { container: ContainerRef, id: Uuid },
    #[error("leaf member {0} owns children")]
    LeafWithChildren(Uuid),
    #[error("root orders are not 1..N: {0:?}")]
    RootsNotDense(Vec<u32>),
}

/// Check density, name uniqueness, path consistency, and collection shape.
pub fn validate(workspace: &Workspace) -> Vec<Violation> {
    let mut violations = Vec::new();
    if !order::is_dense(&workspace.roots) {
        let mut orders: Vec<u32> = workspace.roots.iter().map(|root| root.order).collect();
        orders.sort_unstable();
        violations.push(Violation::RootsNotDense(orders));
    }
    for root in &workspace.roots {
        validate_container(
            root.kind,
            ContainerRef::root(root.id),
            &root.members,
            &NodePath::root(),
            0,
            &mut violations,
        );
    }
    violations
}

fn validate_container(
    kind: CollectionKind,
    container: ContainerRef,
    members: &[Member],
    parent_path: &NodePath,
    depth: usize,
    violations: &mut Vec<Violation>,
) {
    if !order::is_dense(members) {
        let mut orders: Vec<u32> = members.iter().map(|m| m.order).collect();
        orders.sort_unstable();
        violations.push(Violation::NotDense { container, orders });
    }

    for (index, member) in members.iter().enumerate() {
        if find_collision(&members[..index], &member.name, None).is_some() {
            violations.push(Violation::DuplicateName {
                container,
                name: member.name.clone(),
            });
        }

        let expected = parent_path.child(&member.name);
        if member.path != expected {
            violations.push(Violation::PathMismatch {
                id: member.id,
                expected,
                actual: member.path.clone(),
            });
        }

        if !kind.accepts(depth, member.kind) {
            violations.push(Violation::ShapeMismatch {
                container,
                id: member.id,
            });
        }

        if member.is_interior() {
            validate_container(
                kind,
                ContainerRef::node(container.root, member.id),
                &member.children,
                &parent_path.child(&member.name),
                depth + 1,
                violations,
            );
        } else if !member.children.is_empty() {
            violations.push(Violation::LeafWithChildren(member.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Workspace, Uuid, Uuid, Uuid) {
        let top = NodePath::root();
        let login = Member::leaf("login", 1, &top);
        let login_id = login.id;
        let auth = Member::interior("auth", 1, &top).with_children(vec![login]);
        let auth_id = auth.id;
        let root = Root::new("Project", CollectionKind::Tree)
            .with_members(vec![auth, Member::leaf("health", 2, &top)]);
        let root_id = root.id;
        (Workspace::new(vec![root]), root_id, auth_id, login_id)
    }

    #[test]
    fn test_locate_reports_container_and_depth() {
        let (workspace, root_id, auth_id, login_id) = sample();
        let located = workspace.locate(login_id).unwrap();
        assert_eq!(located.container, ContainerRef::node(root_id, auth_id));
        assert_eq!(located.depth, 1);
        assert_eq!(workspace.depth(ContainerRef::node(root_id, auth_id)), Some(1));
        assert_eq!(workspace.depth(ContainerRef::root(root_id)), Some(0));
    }

    #[test]
    fn test_container_of_leaf_is_none() {
        let (workspace, root_id, _, login_id) = sample();
        assert!(workspace.container(ContainerRef::node(root_id, login_id)).is_none());
        assert_eq!(workspace.container(ContainerRef::root(root_id)).unwrap().len(), 2);
    }

    #[test]
    fn test_apply_container_keeps_existing_children() {
        let (mut workspace, root_id, auth_id, _) = sample();
        let mut after = workspace.container(ContainerRef::root(root_id)).unwrap().to_vec();
        after.reverse();
        after[0].order = 1;
        after[1].order = 2;
        after[1].children.clear();

        workspace.apply_container(ContainerRef::root(root_id), &after).unwrap();

        let members = workspace.container(ContainerRef::root(root_id)).unwrap();
        assert_eq!(members[0].name, "health");
        assert_eq!(members[1].id, auth_id);
        assert_eq!(members[1].children.len(), 1, "children come from the cache");
        assert!(validate(&workspace).is_empty());
    }

    #[test]
    fn test_apply_container_unknown() {
        let (mut workspace, root_id, _, login_id) = sample();
        let result = workspace.apply_container(ContainerRef::node(root_id, login_id), &[]);
        assert!(matches!(result, Err(InvariantViolation::UnknownContainer(_))));
    }

    #[test]
    fn test_validate_flags_broken_invariants() {
        let top = NodePath::root();
        let mut stray = Member::leaf("b", 3, &top);
        stray.path = NodePath::new(vec!["elsewhere".into(), "b".into()]);
        let root = Root::new("Globals", CollectionKind::FlatList).with_members(vec![
            Member::leaf("Dev", 1, &top),
            Member::leaf("dev", 2, &top),
            stray,
            Member::interior("group", 4, &top),
        ]);
        let violations = validate(&Workspace::new(vec![root]));

        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::DuplicateName { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::PathMismatch { .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::ShapeMismatch { .. })));
        assert!(!violations
            .iter()
            .any(|v| matches!(v, Violation::NotDense { .. })));
    }

    #[test]
    fn test_apply_root_order_keeps_members() {
        let (mut workspace, root_id, _, login_id) = sample();
        workspace.roots.push(Root::new("Globals", CollectionKind::FlatList));
        workspace.roots[1].order = 2;
        let mut after: Vec<Root> = workspace.roots.iter().map(Root::shallow).collect();
        after.reverse();
        after[0].order = 1;
        after[1].order = 2;

        workspace.apply_root_order(&after).unwrap();

        assert_eq!(workspace.roots[0].name, "Globals");
        assert_eq!(workspace.roots[1].id, root_id);
        assert_eq!(workspace.roots[1].order, 2);
        assert!(workspace.locate(login_id).is_some());
        assert!(validate(&workspace).is_empty());
    }

    #[test]
    fn test_validate_flags_root_gaps() {
        let (mut workspace, _, _, _) = sample();
        workspace.roots[0].order = 3;
        assert_eq!(
            validate(&workspace),
            vec![Violation::RootsNotDense(vec![3])]
        );
    }
}
