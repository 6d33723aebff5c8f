//! Owned-resource use cases: groups, projects, tasks, attachments, quotes.
//!
//! # Responsibility
//! - List, create, update and delete every owned entity kind.
//! - Run the ownership check before touching payloads or rows.
//!
//! # Invariants
//! - Ownership is validated before payload validation; both precede any
//!   mutation, inside one atomic unit of work.
//! - Group and quote addresses hide foreign entities as `NotFound`;
//!   deeper mismatches are `Forbidden`.
//! - Lists under a user require that user to exist.

use crate::model::entity::{EntityId, EntityRef};
use crate::model::hierarchy::{
    Attachment, AttachmentInput, Group, NameInput, Project, Task, TaskInput, TaskWithAttachments,
};
use crate::model::quote::{Quote, QuoteInput};
use crate::repo::entity_repo::EntityStore;
use crate::service::ownership::{
    validate_path, AttachmentPath, GroupPath, OwnedPath, ProjectPath, QuotePath, TaskPath,
};
use crate::service::{ServiceError, ServiceResult};
use log::info;

/// Resource use-case facade over an entity store.
pub struct ResourceService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> ResourceService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn list_groups(&self, user_id: EntityId) -> ServiceResult<Vec<Group>> {
        require_user(&self.store, user_id)?;
        Ok(self.store.list_groups(user_id)?)
    }

    pub fn create_group(&self, user_id: EntityId, input: &NameInput) -> ServiceResult<Group> {
        self.store.atomically(|store| {
            require_user(store, user_id)?;
            let group = Group::new(user_id, input.validate_new()?);
            store.create_group(&group)?;
            log_mutation("create", EntityRef::group(group.id));
            Ok(group)
        })
    }

    pub fn update_group(&self, path: GroupPath, input: &NameInput) -> ServiceResult<Group> {
        self.store.atomically(|store| {
            check_hidden(store, &path)?;
            let mut group = load(store.get_group(path.group_id)?, path.target())?;
            if let Some(name) = input.validate_patch()? {
                group.name = name;
            }
            store.update_group(&group)?;
            log_mutation("update", path.target());
            Ok(group)
        })
    }

    pub fn delete_group(&self, path: GroupPath) -> ServiceResult<()> {
        self.store.atomically(|store| {
            check_hidden(store, &path)?;
            delete(store, path.target())
        })
    }

    /// Every project of the user across all groups.
    pub fn list_projects_for_user(&self, user_id: EntityId) -> ServiceResult<Vec<Project>> {
        require_user(&self.store, user_id)?;
        Ok(self.store.list_projects_for_user(user_id)?)
    }

    pub fn list_projects(&self, group: GroupPath) -> ServiceResult<Vec<Project>> {
        require_user(&self.store, group.user_id)?;
        check_hidden(&self.store, &group)?;
        Ok(self.store.list_projects(group.group_id)?)
    }

    pub fn create_project(&self, group: GroupPath, input: &NameInput) -> ServiceResult<Project> {
        self.store.atomically(|store| {
            require_user(store, group.user_id)?;
            check_hidden(store, &group)?;
            let project = Project::new(group.group_id, input.validate_new()?);
            store.create_project(&project)?;
            log_mutation("create", EntityRef::project(project.id));
            Ok(project)
        })
    }

    pub fn update_project(&self, path: ProjectPath, input: &NameInput) -> ServiceResult<Project> {
        self.store.atomically(|store| {
            check(store, &path)?;
            let mut project = load(store.get_project(path.project_id)?, path.target())?;
            if let Some(name) = input.validate_patch()? {
                project.name = name;
            }
            store.update_project(&project)?;
            log_mutation("update", path.target());
            Ok(project)
        })
    }

    pub fn delete_project(&self, path: ProjectPath) -> ServiceResult<()> {
        self.store.atomically(|store| {
            check(store, &path)?;
            delete(store, path.target())
        })
    }

    pub fn list_tasks(&self, project: ProjectPath) -> ServiceResult<Vec<TaskWithAttachments>> {
        self.store.atomically(|store| {
            check(store, &project)?;
            store
                .list_tasks(project.project_id)?
                .into_iter()
                .map(|task| with_attachments(store, task))
                .collect()
        })
    }

    pub fn create_task(
        &self,
        project: ProjectPath,
        input: TaskInput,
    ) -> ServiceResult<TaskWithAttachments> {
        self.store.atomically(|store| {
            check(store, &project)?;
            let task = input.into_new(project.project_id)?;
            store.create_task(&task)?;
            log_mutation("create", EntityRef::task(task.id));
            Ok(TaskWithAttachments {
                task,
                attachments: Vec::new(),
            })
        })
    }

    pub fn update_task(
        &self,
        path: TaskPath,
        input: &TaskInput,
    ) -> ServiceResult<TaskWithAttachments> {
        self.store.atomically(|store| {
            check(store, &path)?;
            let mut task = load(store.get_task(path.task_id)?, path.target())?;
            input.apply_to(&mut task)?;
            store.update_task(&task)?;
            log_mutation("update", path.target());
            with_attachments(store, task)
        })
    }

    pub fn delete_task(&self, path: TaskPath) -> ServiceResult<()> {
        self.store.atomically(|store| {
            check(store, &path)?;
            delete(store, path.target())
        })
    }

    pub fn list_attachments(&self, task: TaskPath) -> ServiceResult<Vec<Attachment>> {
        self.store.atomically(|store| {
            check(store, &task)?;
            Ok(store.list_attachments(task.task_id)?)
        })
    }

    pub fn create_attachment(
        &self,
        task: TaskPath,
        input: AttachmentInput,
    ) -> ServiceResult<Attachment> {
        self.store.atomically(|store| {
            check(store, &task)?;
            let attachment = input.into_new(task.task_id)?;
            store.create_attachment(&attachment)?;
            log_mutation("create", EntityRef::attachment(attachment.id));
            Ok(attachment)
        })
    }

    pub fn delete_attachment(&self, path: AttachmentPath) -> ServiceResult<()> {
        self.store.atomically(|store| {
            check(store, &path)?;
            delete(store, path.target())
        })
    }

    pub fn list_quotes(&self, user_id: EntityId) -> ServiceResult<Vec<Quote>> {
        require_user(&self.store, user_id)?;
        Ok(self.store.list_quotes(user_id)?)
    }

    pub fn create_quote(&self, user_id: EntityId, input: QuoteInput) -> ServiceResult<Quote> {
        self.store.atomically(|store| {
            require_user(store, user_id)?;
            let quote = input.into_new(user_id)?;
            store.create_quote(&quote)?;
            log_mutation("create", EntityRef::quote(quote.id));
            Ok(quote)
        })
    }

    pub fn get_quote(&self, path: QuotePath) -> ServiceResult<Quote> {
        check_hidden(&self.store, &path)?;
        load(self.store.get_quote(path.quote_id)?, path.target())
    }

    pub fn update_quote(&self, path: QuotePath, input: &QuoteInput) -> ServiceResult<Quote> {
        self.store.atomically(|store| {
            check_hidden(store, &path)?;
            let mut quote = load(store.get_quote(path.quote_id)?, path.target())?;
            input.apply_to(&mut quote)?;
            store.update_quote(&quote)?;
            log_mutation("update", path.target());
            Ok(quote)
        })
    }

    pub fn delete_quote(&self, path: QuotePath) -> ServiceResult<()> {
        self.store.atomically(|store| {
            check_hidden(store, &path)?;
            delete(store, path.target())
        })
    }
}

fn require_user<S: EntityStore>(store: &S, user_id: EntityId) -> ServiceResult<()> {
    if !store.user_exists(user_id)? {
        return Err(ServiceError::NotFound(EntityRef::user(user_id)));
    }
    Ok(())
}

fn check<S: EntityStore, P: OwnedPath>(store: &S, path: &P) -> ServiceResult<()> {
    Ok(validate_path(store, path)?)
}

/// Ownership check for entities addressed directly under their user.
fn check_hidden<S: EntityStore, P: OwnedPath>(store: &S, path: &P) -> ServiceResult<()> {
    validate_path(store, path).map_err(|err| err.hide_foreign().into())
}

fn load<T>(entity: Option<T>, target: EntityRef) -> ServiceResult<T> {
    entity.ok_or(ServiceError::NotFound(target))
}

fn delete<S: EntityStore>(store: &S, target: EntityRef) -> ServiceResult<()> {
    store.delete_entity(target)?;
    log_mutation("delete", target);
    Ok(())
}

fn with_attachments<S: EntityStore>(store: &S, task: Task) -> ServiceResult<TaskWithAttachments> {
    let attachments = store.list_attachments(task.id)?;
    Ok(TaskWithAttachments { task, attachments })
}

fn log_mutation(action: &str, target: EntityRef) {
    info!("event=resource_{action} module=resource status=ok target={target}");
}
