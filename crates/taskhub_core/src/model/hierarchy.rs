//! Group → Project → Task → Attachment records and their request models.
//!
//! # Invariants
//! - Parent ids are assigned by the constructor and never changed by patches.
//! - `Task::priority` defaults to `Medium`, `Task::status` to `Todo`.

use crate::model::entity::EntityId;
use crate::model::validation::{
    nullable, optional_text, required_text, ValidationErrors, MAX_FILE_REFERENCE_CHARS,
    MAX_NAME_CHARS,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_DESCRIPTION_CHARS: usize = 10_000;

/// Named container owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: EntityId,
    pub user_id: EntityId,
    pub name: String,
}

/// Named container owned by one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: EntityId,
    pub group_id: EntityId,
    pub name: String,
}

/// Task urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    #[default]
    Todo,
    InProgress,
    Done,
    /// No longer actionable.
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Unit of work owned by one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: EntityId,
    pub project_id: EntityId,
    pub name: String,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub deadline: Option<i64>,
    /// Unix epoch milliseconds.
    pub reminder: Option<i64>,
    pub priority: Priority,
    pub status: TaskStatus,
}

/// File reference owned by one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: EntityId,
    pub task_id: EntityId,
    pub file: String,
}

/// Task read model with its attachments in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithAttachments {
    pub task: Task,
    pub attachments: Vec<Attachment>,
}

/// Payload for groups and projects: both carry only a name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameInput {
    pub name: Option<String>,
}

impl NameInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Create semantics: `name` is required.
    pub fn validate_new(&self) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match required_text(&mut errors, "name", self.name.as_deref(), MAX_NAME_CHARS) {
            Some(name) => Ok(name),
            None => Err(errors),
        }
    }

    /// Update semantics: absent `name` keeps the current value.
    pub fn validate_patch(&self) -> Result<Option<String>, ValidationErrors> {
        if self.name.is_none() {
            return Ok(None);
        }
        self.validate_new().map(Some)
    }
}

impl Group {
    pub fn new(user_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
        }
    }
}

impl Project {
    pub fn new(group_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            name: name.into(),
        }
    }
}

/// Task create/update payload.
///
/// Nullable fields distinguish absent (keep) from `null` (clear).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reminder: Option<Option<i64>>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

impl TaskInput {
    /// Builds a new task under `project_id`, applying defaults.
    pub fn into_new(self, project_id: EntityId) -> Result<Task, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", self.name.as_deref(), MAX_NAME_CHARS);
        let mut task = Task {
            id: Uuid::new_v4(),
            project_id,
            name: name.unwrap_or_default(),
            description: None,
            deadline: None,
            reminder: None,
            priority: Priority::default(),
            status: TaskStatus::default(),
        };
        self.apply_optional_fields(&mut task, &mut errors);
        errors.into_result().map(|()| task)
    }

    /// Applies present fields onto `task`; leaves it untouched on failure.
    pub fn apply_to(&self, task: &mut Task) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut updated = task.clone();
        if self.name.is_some() {
            if let Some(name) =
                required_text(&mut errors, "name", self.name.as_deref(), MAX_NAME_CHARS)
            {
                updated.name = name;
            }
        }
        self.apply_optional_fields(&mut updated, &mut errors);
        errors.into_result()?;
        *task = updated;
        Ok(())
    }

    fn apply_optional_fields(&self, task: &mut Task, errors: &mut ValidationErrors) {
        if let Some(description) = &self.description {
            task.description = optional_text(
                errors,
                "description",
                description.as_deref(),
                MAX_DESCRIPTION_CHARS,
            );
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
        if let Some(priority) = self.priority.as_deref() {
            match Priority::parse(priority) {
                Some(priority) => task.priority = priority,
                None => errors.add(
                    "priority",
                    "The selected priority is invalid. Expected low|medium|high.",
                ),
            }
        }
        if let Some(status) = self.status.as_deref() {
            match TaskStatus::parse(status) {
                Some(status) => task.status = status,
                None => errors.add(
                    "status",
                    "The selected status is invalid. Expected todo|in_progress|done|cancelled.",
                ),
            }
        }
    }
}

/// Attachment create payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentInput {
    pub file: Option<String>,
}

impl AttachmentInput {
    pub fn into_new(self, task_id: EntityId) -> Result<Attachment, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        match required_text(
            &mut errors,
            "file",
            self.file.as_deref(),
            MAX_FILE_REFERENCE_CHARS,
        ) {
            Some(file) => Ok(Attachment {
                id: Uuid::new_v4(),
                task_id,
                file,
            }),
            None => Err(errors),
        }
    }
}
