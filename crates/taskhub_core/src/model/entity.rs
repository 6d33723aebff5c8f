//! Entity identity and ownership-chain vocabulary.

use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque, server-assigned, immutable identifier shared by every entity.
pub type EntityId = Uuid;

/// Every persisted entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Group,
    Project,
    Task,
    Attachment,
    Quote,
}

impl EntityKind {
    /// Kind of the owning parent. `None` for the chain root.
    pub fn parent_kind(self) -> Option<EntityKind> {
        match self {
            Self::User => None,
            Self::Group | Self::Quote => Some(Self::User),
            Self::Project => Some(Self::Group),
            Self::Task => Some(Self::Project),
            Self::Attachment => Some(Self::Task),
        }
    }

    /// Number of ancestors between this kind and its owning user.
    pub fn depth(self) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent_kind();
        while let Some(kind) = cursor {
            depth += 1;
            cursor = kind.parent_kind();
        }
        depth
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Project => "project",
            Self::Task => "task",
            Self::Attachment => "attachment",
            Self::Quote => "quote",
        }
    }

    /// Capitalized label used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Project => "Project",
            Self::Task => "Task",
            Self::Attachment => "Attachment",
            Self::Quote => "Quote",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed pointer to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    pub fn user(id: EntityId) -> Self {
        Self::new(EntityKind::User, id)
    }

    pub fn group(id: EntityId) -> Self {
        Self::new(EntityKind::Group, id)
    }

    pub fn project(id: EntityId) -> Self {
        Self::new(EntityKind::Project, id)
    }

    pub fn task(id: EntityId) -> Self {
        Self::new(EntityKind::Task, id)
    }

    pub fn attachment(id: EntityId) -> Self {
        Self::new(EntityKind::Attachment, id)
    }

    pub fn quote(id: EntityId) -> Self {
        Self::new(EntityKind::Quote, id)
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
