//! Response field sets for every resource kind.

use serde::Serialize;
use taskhub_core::model::hierarchy::{
    Attachment, Group, Priority, Project, TaskStatus, TaskWithAttachments,
};
use taskhub_core::model::quote::Quote;
use taskhub_core::model::user::User;
use taskhub_core::{EntityId, EntityKind};

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Delete acknowledgement: `{"message": "<Kind> deleted"}`.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: String,
}

impl Deleted {
    pub fn of(kind: EntityKind) -> Self {
        Self {
            message: format!("{} deleted", kind.label()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResource {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
}

impl From<User> for UserResource {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            profile_picture: value.profile_picture,
        }
    }
}

/// Groups and projects share the `id, name` shape.
#[derive(Debug, Serialize)]
pub struct NamedResource {
    pub id: EntityId,
    pub name: String,
}

impl From<Group> for NamedResource {
    fn from(value: Group) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<Project> for NamedResource {
    fn from(value: Project) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttachmentResource {
    pub id: EntityId,
    pub file: String,
}

impl From<Attachment> for AttachmentResource {
    fn from(value: Attachment) -> Self {
        Self {
            id: value.id,
            file: value.file,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResource {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<i64>,
    pub reminder: Option<i64>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub attachments: Vec<AttachmentResource>,
}

impl From<TaskWithAttachments> for TaskResource {
    fn from(value: TaskWithAttachments) -> Self {
        let TaskWithAttachments { task, attachments } = value;
        Self {
            id: task.id,
            name: task.name,
            description: task.description,
            deadline: task.deadline,
            reminder: task.reminder,
            priority: task.priority,
            status: task.status,
            attachments: collect(attachments),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteResource {
    pub id: EntityId,
    pub content: String,
    pub author: Option<String>,
}

impl From<Quote> for QuoteResource {
    fn from(value: Quote) -> Self {
        Self {
            id: value.id,
            content: value.content,
            author: value.author,
        }
    }
}

pub fn collect<T, R: From<T>>(items: Vec<T>) -> Vec<R> {
    items.into_iter().map(R::from).collect()
}
