use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Member, MemberKind};

/// The shape a root's collection is allowed to take.
///
/// - `Tree`: a project's nested resource tree; any depth, any kind
/// - `FlatList`: workspace-level environments; leaves only, no nesting
/// - `GroupedList`: per-project environment groups; groups at the top level,
///   environments inside them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Tree,
    FlatList,
    GroupedList,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::FlatList => "flat_list",
            Self::GroupedList => "grouped_list",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "tree" => Some(Self::Tree),
            "flat_list" => Some(Self::FlatList),
            "grouped_list" => Some(Self::GroupedList),
            _ => None,
        }
    }

    /// Whether a member of `kind` may live at `depth` (0 = directly under the root).
    pub fn accepts(&self, depth: usize, kind: MemberKind) -> bool {
        match self {
            Self::Tree => true,
            Self::FlatList => depth == 0 && kind == MemberKind::Leaf,
            Self::GroupedList => match depth {
                0 => kind == MemberKind::Interior,
                1 => kind == MemberKind::Leaf,
                _ => false,
            },
        }
    }
}

/// Identifies a container: either a root itself, or an interior member of that root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerRef {
    pub root: Uuid,
    /// `None` when the container is the root itself.
    pub node: Option<Uuid>,
}

impl ContainerRef {
    pub fn root(root: Uuid) -> Self {
        Self { root, node: None }
    }

    pub fn node(root: Uuid, node: Uuid) -> Self {
        Self {
            root,
            node: Some(node),
        }
    }

    pub fn is_root(&self) -> bool {
        self.node.is_none()
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{}/{}", self.root, node),
            None => write!(f, "{}", self.root),
        }
    }
}

/// A top-level collection: a project tree, the global environment list, or a
/// set of project environment groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub id: Uuid,
    pub name: String,
    pub kind: CollectionKind,
    /// Position among the workspace's roots, 1..N.
    pub order: u32,
    pub members: Vec<Member>,
}

impl Root {
    pub fn new(name: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            order: 0,
            members: Vec::new(),
        }
    }

    /// A copy without members.
    pub fn shallow(&self) -> Self {
        Self {
            members: Vec::new(),
            ..self.clone()
        }
    }

    pub fn with_members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }

    pub fn container_ref(&self) -> ContainerRef {
        ContainerRef::root(self.id)
    }
}

/// The in-memory snapshot of every root the client shows.
///
/// Lookups and cache patching live in [`crate::tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub roots: Vec<Root>,
}

impl Workspace {
    /// Build a workspace from roots listed in display order, numbering them 1..N.
    pub fn new(roots: Vec<Root>) -> Self {
        Self {
            roots: crate::order::renumber(roots),
        }
    }
}
