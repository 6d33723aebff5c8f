//! Ownership-chain validation.
//!
//! # Responsibility
//! - Confirm that ancestor ids asserted by a caller match the stored parent
//!   pointers of an entity, one level at a time.
//!
//! # Invariants
//! - Only stored parent pointers are consulted; caller ids are compared,
//!   never followed.
//! - Comparison is strict: kind and id must both match.
//! - The walk stops at the first mismatch; null or dangling links deny.
//! - A missing target is `NotFound`, never `Forbidden`.

use crate::model::entity::{EntityId, EntityKind, EntityRef};
use crate::repo::entity_repo::{EntityStore, ParentLink};
use crate::repo::RepoError;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Ownership validation failure.
#[derive(Debug)]
pub enum OwnershipError {
    NotFound(EntityRef),
    Forbidden {
        target: EntityRef,
        /// Ancestor the caller asserted at the failing level.
        claimed: EntityRef,
        /// Stored ancestor at that level, if any.
        actual: Option<EntityRef>,
    },
    Repo(RepoError),
}

impl OwnershipError {
    /// Reports a mismatch as absence of the target.
    ///
    /// Used for entities addressed only through their owning user
    /// (`/users/{u}/groups/{g}`), where another user's entity does not
    /// exist at the requested address.
    pub fn hide_foreign(self) -> Self {
        match self {
            Self::Forbidden { target, .. } => Self::NotFound(target),
            other => other,
        }
    }
}

impl Display for OwnershipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "entity not found: {entity}"),
            Self::Forbidden {
                target,
                claimed,
                actual,
            } => match actual {
                Some(actual) => write!(
                    f,
                    "ownership mismatch for {target}: claimed {claimed}, stored {actual}"
                ),
                None => write!(
                    f,
                    "ownership mismatch for {target}: claimed {claimed}, stored link missing"
                ),
            },
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OwnershipError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for OwnershipError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Validates `chain` (root-first, as written in a request path) against the
/// stored ancestors of `target`.
pub fn validate<S: EntityStore>(
    store: &S,
    target: EntityRef,
    chain: &[(EntityKind, EntityId)],
) -> Result<(), OwnershipError> {
    let mut current = target;

    for (level, &(kind, id)) in chain.iter().rev().enumerate() {
        let claimed = EntityRef::new(kind, id);
        let actual = match store.parent_link(current)? {
            ParentLink::Missing if level == 0 => return Err(OwnershipError::NotFound(target)),
            ParentLink::Parent(parent) => Some(parent),
            ParentLink::Missing | ParentLink::Orphaned | ParentLink::Root => None,
        };

        match actual {
            Some(parent) if parent == claimed => current = parent,
            actual => return Err(deny(target, claimed, actual)),
        }
    }

    if chain.is_empty() && store.parent_link(target)? == ParentLink::Missing {
        return Err(OwnershipError::NotFound(target));
    }
    Ok(())
}

/// Validates a typed request path.
pub fn validate_path<S: EntityStore, P: OwnedPath>(store: &S, path: &P) -> Result<(), OwnershipError> {
    validate(store, path.target(), &path.ancestors())
}

fn deny(target: EntityRef, claimed: EntityRef, actual: Option<EntityRef>) -> OwnershipError {
    warn!(
        "event=ownership_denied module=ownership status=denied target={} claimed={} actual={}",
        target,
        claimed,
        actual.map_or_else(|| "none".to_string(), |value| value.to_string())
    );
    OwnershipError::Forbidden {
        target,
        claimed,
        actual,
    }
}

/// A request path naming one entity plus its asserted ancestors.
pub trait OwnedPath {
    fn target(&self) -> EntityRef;
    /// Asserted ancestors, root-first.
    fn ancestors(&self) -> Vec<(EntityKind, EntityId)>;
}

/// `/users/{user_id}/groups/{group_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPath {
    pub user_id: EntityId,
    pub group_id: EntityId,
}

/// `…/groups/{group_id}/projects/{project_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectPath {
    pub user_id: EntityId,
    pub group_id: EntityId,
    pub project_id: EntityId,
}

/// `…/projects/{project_id}/tasks/{task_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPath {
    pub user_id: EntityId,
    pub group_id: EntityId,
    pub project_id: EntityId,
    pub task_id: EntityId,
}

/// `…/tasks/{task_id}/attachments/{attachment_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPath {
    pub task: TaskPath,
    pub attachment_id: EntityId,
}

/// `/users/{user_id}/quotes/{quote_id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotePath {
    pub user_id: EntityId,
    pub quote_id: EntityId,
}

impl GroupPath {
    pub fn project(self, project_id: EntityId) -> ProjectPath {
        ProjectPath {
            user_id: self.user_id,
            group_id: self.group_id,
            project_id,
        }
    }
}

impl ProjectPath {
    pub fn task(self, task_id: EntityId) -> TaskPath {
        TaskPath {
            user_id: self.user_id,
            group_id: self.group_id,
            project_id: self.project_id,
            task_id,
        }
    }
}

impl TaskPath {
    pub fn attachment(self, attachment_id: EntityId) -> AttachmentPath {
        AttachmentPath {
            task: self,
            attachment_id,
        }
    }
}

impl OwnedPath for GroupPath {
    fn target(&self) -> EntityRef {
        EntityRef::group(self.group_id)
    }

    fn ancestors(&self) -> Vec<(EntityKind, EntityId)> {
        vec![(EntityKind::User, self.user_id)]
    }
}

impl OwnedPath for ProjectPath {
    fn target(&self) -> EntityRef {
        EntityRef::project(self.project_id)
    }

    fn ancestors(&self) -> Vec<(EntityKind, EntityId)> {
        vec![
            (EntityKind::User, self.user_id),
            (EntityKind::Group, self.group_id),
        ]
    }
}

impl OwnedPath for TaskPath {
    fn target(&self) -> EntityRef {
        EntityRef::task(self.task_id)
    }

    fn ancestors(&self) -> Vec<(EntityKind, EntityId)> {
        vec![
            (EntityKind::User, self.user_id),
            (EntityKind::Group, self.group_id),
            (EntityKind::Project, self.project_id),
        ]
    }
}

impl OwnedPath for AttachmentPath {
    fn target(&self) -> EntityRef {
        EntityRef::attachment(self.attachment_id)
    }

    fn ancestors(&self) -> Vec<(EntityKind, EntityId)> {
        let mut chain = self.task.ancestors();
        chain.push((EntityKind::Task, self.task.task_id));
        chain
    }
}

impl OwnedPath for QuotePath {
    fn target(&self) -> EntityRef {
        EntityRef::quote(self.quote_id)
    }

    fn ancestors(&self) -> Vec<(EntityKind, EntityId)> {
        vec![(EntityKind::User, self.user_id)]
    }
}
