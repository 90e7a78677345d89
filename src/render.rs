//! ASCII rendering of a workspace with sibling orders.

use crate::models::{Member, MemberKind, Root, Workspace};

const INTERIOR: char = '▸';
const LEAF: char = '•';

fn kind_symbol(kind: MemberKind) -> char {
    match kind {
        MemberKind::Interior => INTERIOR,
        MemberKind::Leaf => LEAF,
    }
}

/// Render every root as a tree, members prefixed by their order.
///
/// Example output:
/// ```text
/// Project [tree]
/// ├── 1 ▸ api
/// │   ├── 1 • login
/// │   └── 2 • logout
/// └── 2 • health
/// ```
pub fn render_workspace(workspace: &Workspace, show_ids: bool) -> String {
    let mut output = String::new();
    for root in &workspace.roots {
        render_root(&mut output, root, show_ids);
    }
    output
}

pub fn render_root(output: &mut String, root: &Root, show_ids: bool) {
    output.push_str(&root.name);
    output.push_str(" [");
    output.push_str(root.kind.as_str());
    output.push(']');
    if show_ids {
        output.push_str(&format!("  {}", root.id));
    }
    output.push('\n');

    for (i, member) in root.members.iter().enumerate() {
        let is_last = i == root.members.len() - 1;
        render_member(output, member, "", is_last, show_ids);
    }
}

fn render_member(
    output: &mut String,
    member: &Member,
    prefix: &str,
    is_last: bool,
    show_ids: bool,
) {
    let branch = if is_last { "└── " } else { "├── " };
    output.push_str(prefix);
    output.push_str(branch);
    output.push_str(&format!("{} {} {}", member.order, kind_symbol(member.kind), member.name));
    if show_ids {
        output.push_str(&format!("  {}", member.id));
    }
    output.push('\n');

    let continuation = if is_last { "    " } else { "│   " };
    let child_prefix = format!("{}{}", prefix, continuation);
    for (i, child) in member.children.iter().enumerate() {
        let child_is_last = i == member.children.len() - 1;
        render_member(output, child, &child_prefix, child_is_last, show_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionKind, NodePath};

    #[test]
    fn test_empty_root() {
        let workspace = Workspace::new(vec![Root::new("Globals", CollectionKind::FlatList)]);
        assert_eq!(render_workspace(&workspace, false), "Globals [flat_list]\n");
    }

    #[test]
    fn test_nested_members() {
        let top = NodePath::root();
        let api = Member::interior("api", 1, &top).with_children(vec![
            Member::leaf("login", 1, &top),
            Member::leaf("logout", 2, &top),
        ]);
        let root = Root::new("Project", CollectionKind::Tree)
            .with_members(vec![api, Member::leaf("health", 2, &top)]);
        let output = render_workspace(&Workspace::new(vec![root]), false);
        let expected = "Project [tree]\n├── 1 ▸ api\n│   ├── 1 • login\n│   └── 2 • logout\n└── 2 • health\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_ids_are_appended() {
        let member = Member::leaf("dev", 1, &NodePath::root());
        let id = member.id;
        let root = Root::new("Globals", CollectionKind::FlatList).with_members(vec![member]);
        let output = render_workspace(&Workspace::new(vec![root]), true);
        assert!(output.contains(&format!("└── 1 • dev  {id}")));
    }
}
