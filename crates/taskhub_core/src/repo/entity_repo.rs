//! Hierarchy repository: groups, projects, tasks, attachments, quotes.
//!
//! # Responsibility
//! - CRUD over the owned entity tables.
//! - Expose the parent-pointer lookup that ownership validation walks.
//!
//! # Invariants
//! - Parent columns are written on insert only.
//! - Child listing is deterministic: insertion order (`created_at`, `rowid`).
//! - Deleting a row cascades to its subtree through foreign keys.

use crate::model::entity::{EntityId, EntityKind, EntityRef};
use crate::model::hierarchy::{Attachment, Group, Priority, Project, Task, TaskStatus};
use crate::model::quote::Quote;
use crate::repo::{ensure_connection_ready, parse_uuid, with_immediate_tx, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Result of one parent-pointer lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink {
    /// The entity itself does not exist.
    Missing,
    /// The entity is a user; the chain ends here.
    Root,
    /// The entity exists but its parent pointer is null.
    Orphaned,
    Parent(EntityRef),
}

/// Repository interface for the owned entity hierarchy.
pub trait EntityStore {
    /// Loads the stored parent pointer of `entity`.
    fn parent_link(&self, entity: EntityRef) -> RepoResult<ParentLink>;
    /// Runs `f` as one atomic unit of work against this store.
    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
    /// Removes one entity and, through cascades, its descendants.
    fn delete_entity(&self, entity: EntityRef) -> RepoResult<()>;

    fn user_exists(&self, user_id: EntityId) -> RepoResult<bool>;

    fn create_group(&self, group: &Group) -> RepoResult<()>;
    fn get_group(&self, id: EntityId) -> RepoResult<Option<Group>>;
    fn list_groups(&self, user_id: EntityId) -> RepoResult<Vec<Group>>;
    fn update_group(&self, group: &Group) -> RepoResult<()>;

    fn create_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: EntityId) -> RepoResult<Option<Project>>;
    fn list_projects(&self, group_id: EntityId) -> RepoResult<Vec<Project>>;
    /// Every project across all groups of one user.
    fn list_projects_for_user(&self, user_id: EntityId) -> RepoResult<Vec<Project>>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;

    fn create_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, id: EntityId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, project_id: EntityId) -> RepoResult<Vec<Task>>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;

    fn create_attachment(&self, attachment: &Attachment) -> RepoResult<()>;
    fn get_attachment(&self, id: EntityId) -> RepoResult<Option<Attachment>>;
    fn list_attachments(&self, task_id: EntityId) -> RepoResult<Vec<Attachment>>;

    fn create_quote(&self, quote: &Quote) -> RepoResult<()>;
    fn get_quote(&self, id: EntityId) -> RepoResult<Option<Quote>>;
    fn list_quotes(&self, user_id: EntityId) -> RepoResult<Vec<Quote>>;
    fn update_quote(&self, quote: &Quote) -> RepoResult<()>;
}

/// SQLite-backed entity store.
pub struct SqliteEntityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityStore<'conn> {
    /// Creates the store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

/// Table and parent column backing each kind.
fn storage_of(kind: EntityKind) -> (&'static str, Option<(&'static str, EntityKind)>) {
    match kind {
        EntityKind::User => ("users", None),
        EntityKind::Group => ("user_groups", Some(("user_id", EntityKind::User))),
        EntityKind::Project => ("projects", Some(("group_id", EntityKind::Group))),
        EntityKind::Task => ("tasks", Some(("project_id", EntityKind::Project))),
        EntityKind::Attachment => ("attachments", Some(("task_id", EntityKind::Task))),
        EntityKind::Quote => ("quotes", Some(("user_id", EntityKind::User))),
    }
}

const TASK_COLUMNS: &str =
    "id, project_id, name, description, deadline, reminder, priority, status";

impl EntityStore for SqliteEntityStore<'_> {
    fn parent_link(&self, entity: EntityRef) -> RepoResult<ParentLink> {
        let (table, parent) = storage_of(entity.kind);
        let Some((parent_column, parent_kind)) = parent else {
            let exists = self.user_exists(entity.id)?;
            return Ok(if exists {
                ParentLink::Root
            } else {
                ParentLink::Missing
            });
        };

        let row: Option<Option<String>> = self
            .conn
            .query_row(
                &format!("SELECT {parent_column} FROM {table} WHERE id = ?1;"),
                [entity.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match row {
            None => Ok(ParentLink::Missing),
            Some(None) => Ok(ParentLink::Orphaned),
            Some(Some(parent_id)) => {
                let id = parse_uuid(&parent_id, parent_column)?;
                Ok(ParentLink::Parent(EntityRef::new(parent_kind, id)))
            }
        }
    }

    fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        with_immediate_tx(self.conn, || f(self))
    }

    fn delete_entity(&self, entity: EntityRef) -> RepoResult<()> {
        let (table, _) = storage_of(entity.kind);
        let changed = self.conn.execute(
            &format!("DELETE FROM {table} WHERE id = ?1;"),
            [entity.id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(entity));
        }
        Ok(())
    }

    fn user_exists(&self, user_id: EntityId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            [user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_group(&self, group: &Group) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO user_groups (id, user_id, name) VALUES (?1, ?2, ?3);",
            params![group.id.to_string(), group.user_id.to_string(), group.name],
        )?;
        Ok(())
    }

    fn get_group(&self, id: EntityId) -> RepoResult<Option<Group>> {
        self.query_one(
            "SELECT id, user_id, name FROM user_groups WHERE id = ?1;",
            id,
            parse_group_row,
        )
    }

    fn list_groups(&self, user_id: EntityId) -> RepoResult<Vec<Group>> {
        self.query_many(
            "SELECT id, user_id, name
             FROM user_groups
             WHERE user_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
            user_id,
            parse_group_row,
        )
    }

    fn update_group(&self, group: &Group) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE user_groups
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![group.id.to_string(), group.name],
        )?;
        expect_changed(changed, EntityRef::group(group.id))
    }

    fn create_project(&self, project: &Project) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO projects (id, group_id, name) VALUES (?1, ?2, ?3);",
            params![
                project.id.to_string(),
                project.group_id.to_string(),
                project.name
            ],
        )?;
        Ok(())
    }

    fn get_project(&self, id: EntityId) -> RepoResult<Option<Project>> {
        self.query_one(
            "SELECT id, group_id, name FROM projects WHERE id = ?1;",
            id,
            parse_project_row,
        )
    }

    fn list_projects(&self, group_id: EntityId) -> RepoResult<Vec<Project>> {
        self.query_many(
            "SELECT id, group_id, name
             FROM projects
             WHERE group_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
            group_id,
            parse_project_row,
        )
    }

    fn list_projects_for_user(&self, user_id: EntityId) -> RepoResult<Vec<Project>> {
        self.query_many(
            "SELECT p.id AS id, p.group_id AS group_id, p.name AS name
             FROM projects p
             INNER JOIN user_groups g ON g.id = p.group_id
             WHERE g.user_id = ?1
             ORDER BY g.created_at ASC, g.rowid ASC, p.created_at ASC, p.rowid ASC;",
            user_id,
            parse_project_row,
        )
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![project.id.to_string(), project.name],
        )?;
        expect_changed(changed, EntityRef::project(project.id))
    }

    fn create_task(&self, task: &Task) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO tasks (
                id,
                project_id,
                name,
                description,
                deadline,
                reminder,
                priority,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                task.id.to_string(),
                task.project_id.to_string(),
                task.name,
                task.description.as_deref(),
                task.deadline,
                task.reminder,
                task.priority.as_str(),
                task.status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, id: EntityId) -> RepoResult<Option<Task>> {
        self.query_one(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1;"),
            id,
            parse_task_row,
        )
    }

    fn list_tasks(&self, project_id: EntityId) -> RepoResult<Vec<Task>> {
        self.query_many(
            &format!(
                "SELECT {TASK_COLUMNS}
                 FROM tasks
                 WHERE project_id = ?1
                 ORDER BY created_at ASC, rowid ASC;"
            ),
            project_id,
            parse_task_row,
        )
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                name = ?2,
                description = ?3,
                deadline = ?4,
                reminder = ?5,
                priority = ?6,
                status = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                task.id.to_string(),
                task.name,
                task.description.as_deref(),
                task.deadline,
                task.reminder,
                task.priority.as_str(),
                task.status.as_str(),
            ],
        )?;
        expect_changed(changed, EntityRef::task(task.id))
    }

    fn create_attachment(&self, attachment: &Attachment) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO attachments (id, task_id, file) VALUES (?1, ?2, ?3);",
            params![
                attachment.id.to_string(),
                attachment.task_id.to_string(),
                attachment.file
            ],
        )?;
        Ok(())
    }

    fn get_attachment(&self, id: EntityId) -> RepoResult<Option<Attachment>> {
        self.query_one(
            "SELECT id, task_id, file FROM attachments WHERE id = ?1;",
            id,
            parse_attachment_row,
        )
    }

    fn list_attachments(&self, task_id: EntityId) -> RepoResult<Vec<Attachment>> {
        self.query_many(
            "SELECT id, task_id, file
             FROM attachments
             WHERE task_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
            task_id,
            parse_attachment_row,
        )
    }

    fn create_quote(&self, quote: &Quote) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO quotes (id, user_id, content, author) VALUES (?1, ?2, ?3, ?4);",
            params![
                quote.id.to_string(),
                quote.user_id.to_string(),
                quote.content,
                quote.author.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn get_quote(&self, id: EntityId) -> RepoResult<Option<Quote>> {
        self.query_one(
            "SELECT id, user_id, content, author FROM quotes WHERE id = ?1;",
            id,
            parse_quote_row,
        )
    }

    fn list_quotes(&self, user_id: EntityId) -> RepoResult<Vec<Quote>> {
        self.query_many(
            "SELECT id, user_id, content, author
             FROM quotes
             WHERE user_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
            user_id,
            parse_quote_row,
        )
    }

    fn update_quote(&self, quote: &Quote) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE quotes
             SET content = ?2,
                 author = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                quote.id.to_string(),
                quote.content,
                quote.author.as_deref()
            ],
        )?;
        expect_changed(changed, EntityRef::quote(quote.id))
    }
}

impl SqliteEntityStore<'_> {
    fn query_one<T>(
        &self,
        sql: &str,
        id: EntityId,
        parse: fn(&Row<'_>) -> RepoResult<T>,
    ) -> RepoResult<Option<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse(row)?));
        }
        Ok(None)
    }

    fn query_many<T>(
        &self,
        sql: &str,
        parent_id: EntityId,
        parse: fn(&Row<'_>) -> RepoResult<T>,
    ) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([parent_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse(row)?);
        }
        Ok(items)
    }
}

fn expect_changed(changed: usize, entity: EntityRef) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound(entity));
    }
    Ok(())
}

fn required_parent(row: &Row<'_>, column: &'static str) -> RepoResult<EntityId> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => parse_uuid(&value, column),
        None => Err(RepoError::InvalidData(format!(
            "orphaned row: null {column}"
        ))),
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let id: String = row.get("id")?;
    Ok(Group {
        id: parse_uuid(&id, "user_groups.id")?,
        user_id: required_parent(row, "user_id")?,
        name: row.get("name")?,
    })
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id: String = row.get("id")?;
    Ok(Project {
        id: parse_uuid(&id, "projects.id")?,
        group_id: required_parent(row, "group_id")?,
        name: row.get("name")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: String = row.get("id")?;

    let priority_text: String = row.get("priority")?;
    let priority = Priority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid priority `{priority_text}` in tasks.priority"))
    })?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    Ok(Task {
        id: parse_uuid(&id, "tasks.id")?,
        project_id: required_parent(row, "project_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        deadline: row.get("deadline")?,
        reminder: row.get("reminder")?,
        priority,
        status,
    })
}

fn parse_attachment_row(row: &Row<'_>) -> RepoResult<Attachment> {
    let id: String = row.get("id")?;
    Ok(Attachment {
        id: parse_uuid(&id, "attachments.id")?,
        task_id: required_parent(row, "task_id")?,
        file: row.get("file")?,
    })
}

fn parse_quote_row(row: &Row<'_>) -> RepoResult<Quote> {
    let id: String = row.get("id")?;
    Ok(Quote {
        id: parse_uuid(&id, "quotes.id")?,
        user_id: required_parent(row, "user_id")?,
        content: row.get("content")?,
        author: row.get("author")?,
    })
}
