use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ContainerRef, MemberKind, NodePath};

/// A partial update of one member. Only the fields that changed are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCommand {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// New parent container. Carries the root, so a cross-root move re-homes the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ContainerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<NodePath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UpdateCommand {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            order: None,
            parent: None,
            path: None,
            name: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_none() && self.parent.is_none() && self.path.is_none() && self.name.is_none()
    }
}

/// A member that has no prior record and must be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub id: Uuid,
    pub parent: ContainerRef,
    pub name: String,
    pub kind: MemberKind,
    pub order: u32,
    pub path: NodePath,
}

/// Every change one container needs, dispatched to the commit capability as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub container: ContainerRef,
    #[serde(default)]
    pub creates: Vec<NewMember>,
    #[serde(default)]
    pub updates: Vec<UpdateCommand>,
    /// Ids to delete, including every descendant of a deleted interior member.
    #[serde(default)]
    pub deletes: Vec<Uuid>,
}

impl Batch {
    pub fn new(container: ContainerRef) -> Self {
        Self {
            container,
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }

    pub fn update_for(&self, id: Uuid) -> Option<&UpdateCommand> {
        self.updates.iter().find(|update| update.id == id)
    }
}

/// A new position for one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootUpdate {
    pub id: Uuid,
    pub order: u32,
}

/// Order changes of the workspace's root list, committed as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBatch {
    #[serde(default)]
    pub updates: Vec<RootUpdate>,
}

impl RootBatch {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn update_for(&self, id: Uuid) -> Option<&RootUpdate> {
        self.updates.iter().find(|update| update.id == id)
    }
}
