use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a member can own children of its own.
///
/// - `Leaf`: a request, an environment, or any other terminal entry
/// - `Interior`: a directory, folder, or environment group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Leaf,
    Interior,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Interior => "interior",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "leaf" => Some(Self::Leaf),
            "interior" => Some(Self::Interior),
            _ => None,
        }
    }
}

/// Name segments from a root down to a member, ending in the member's own name.
///
/// The root itself contributes no segment, so a top-level member's path is just
/// its name and the root's own path is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// The empty path of a root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of a direct child called `name`.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    /// Path with the last segment removed. The root's parent is the root.
    pub fn parent(&self) -> Self {
        let mut segments = self.0.clone();
        segments.pop();
        Self(segments)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for NodePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A single orderable entry inside a container.
///
/// Members are owned by exactly one container. `order` is dense (1..N) among
/// siblings at rest, and `name` is unique among siblings without regard to case.
/// Interior members own their own ordered `children`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub order: u32,
    pub kind: MemberKind,
    pub path: NodePath,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Member>,
}

impl Member {
    /// A fresh leaf placed directly under `parent`.
    pub fn leaf(name: impl Into<String>, order: u32, parent: &NodePath) -> Self {
        Self::new(name.into(), order, MemberKind::Leaf, parent)
    }

    /// A fresh interior member placed directly under `parent`.
    pub fn interior(name: impl Into<String>, order: u32, parent: &NodePath) -> Self {
        Self::new(name.into(), order, MemberKind::Interior, parent)
    }

    fn new(name: String, order: u32, kind: MemberKind, parent: &NodePath) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: parent.child(&name),
            name,
            order,
            kind,
            children: Vec::new(),
        }
    }

    /// Replace the children, re-deriving their paths under this member.
    pub fn with_children(mut self, children: Vec<Member>) -> Self {
        let path = self.path.clone();
        self.children = children.into_iter().map(|c| c.rebased(&path)).collect();
        self
    }

    pub fn is_interior(&self) -> bool {
        self.kind == MemberKind::Interior
    }

    /// Case-insensitive name comparison used for sibling uniqueness.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Whether `id` is a strict descendant of this member.
    pub fn contains(&self, id: Uuid) -> bool {
        self.children
            .iter()
            .any(|child| child.id == id || child.contains(id))
    }

    /// This member and every descendant, depth-first in sibling order.
    pub fn subtree(&self) -> Vec<&Member> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.subtree());
        }
        out
    }

    /// A copy of this member without its children.
    pub fn shallow(&self) -> Member {
        Member {
            id: self.id,
            name: self.name.clone(),
            order: self.order,
            kind: self.kind,
            path: self.path.clone(),
            children: Vec::new(),
        }
    }

    /// Re-derive `path` for this member and all descendants under `parent`.
    pub fn rebased(mut self, parent: &NodePath) -> Member {
        self.path = parent.child(&self.name);
        let path = self.path.clone();
        self.children = std::mem::take(&mut self.children)
            .into_iter()
            .map(|child| child.rebased(&path))
            .collect();
        self
    }
}
