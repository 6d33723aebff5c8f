use rusqlite::Connection;
use taskhub_core::db::open_db_in_memory;
use taskhub_core::model::hierarchy::{AttachmentInput, NameInput, Priority, TaskInput, TaskStatus};
use taskhub_core::model::quote::QuoteInput;
use taskhub_core::model::user::User;
use taskhub_core::service::ownership::{GroupPath, ProjectPath, QuotePath, TaskPath};
use taskhub_core::{
    EntityKind, EntityStore, ResourceService, ServiceError, SqliteEntityStore,
    SqliteUserRepository, UserRepository,
};
use uuid::Uuid;

fn seed_user(conn: &Connection, email: &str) -> Uuid {
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    let user = User {
        id: Uuid::new_v4(),
        name: "Owner".to_string(),
        email: email.to_string(),
        password_hash: None,
        external_id: None,
        profile_picture: None,
        created_at: 0,
        updated_at: 0,
    };
    repo.create_user(&user).unwrap();
    user.id
}

fn service(conn: &Connection) -> ResourceService<SqliteEntityStore<'_>> {
    ResourceService::new(SqliteEntityStore::try_new(conn).unwrap())
}

fn named_task(name: &str) -> TaskInput {
    TaskInput {
        name: Some(name.to_string()),
        ..TaskInput::default()
    }
}

fn quote(content: String) -> QuoteInput {
    QuoteInput {
        content: Some(content),
        author: None,
    }
}

/// Creates user -> group -> project and returns the project path.
fn seed_project(conn: &Connection, email: &str) -> ProjectPath {
    let user_id = seed_user(conn, email);
    let resources = service(conn);
    let group = resources
        .create_group(user_id, &NameInput::named("Work"))
        .unwrap();
    let group_path = GroupPath {
        user_id,
        group_id: group.id,
    };
    let project = resources
        .create_project(group_path, &NameInput::named("Launch"))
        .unwrap();
    group_path.project(project.id)
}

#[test]
fn task_lifecycle_under_owned_project() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, "ana@example.com");
    let resources = service(&conn);

    let created = resources
        .create_task(project, named_task("Write notes"))
        .unwrap();
    assert_eq!(created.task.priority, Priority::Medium);
    assert_eq!(created.task.status, TaskStatus::Todo);
    assert!(created.attachments.is_empty());

    let path = project.task(created.task.id);
    resources
        .create_attachment(
            path,
            AttachmentInput {
                file: Some("draft.md".to_string()),
            },
        )
        .unwrap();

    let patch: TaskInput =
        serde_json::from_value(serde_json::json!({"status": "done", "deadline": null})).unwrap();
    let updated = resources.update_task(path, &patch).unwrap();
    assert_eq!(updated.task.status, TaskStatus::Done);
    assert_eq!(updated.task.name, "Write notes");
    assert_eq!(updated.attachments.len(), 1);

    let listed = resources.list_tasks(project).unwrap();
    assert_eq!(listed, vec![updated]);
}

#[test]
fn delete_task_with_foreign_project_is_forbidden_and_keeps_task() {
    let conn = open_db_in_memory().unwrap();
    let mine = seed_project(&conn, "ana@example.com");
    let other = seed_project(&conn, "bo@example.com");
    let resources = service(&conn);
    let task = resources.create_task(mine, named_task("Keep me")).unwrap();

    let mut path = mine.task(task.task.id);
    path.project_id = other.project_id;
    assert!(matches!(
        resources.delete_task(path),
        Err(ServiceError::Forbidden(_))
    ));

    let remaining = resources.list_tasks(mine).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].task.id, task.task.id);
}

#[test]
fn projects_of_foreign_group_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_project(&conn, "ana@example.com");
    let intruder = seed_user(&conn, "bo@example.com");
    let resources = service(&conn);

    let path = GroupPath {
        user_id: intruder,
        group_id: owner.group_id,
    };
    match resources.list_projects(path) {
        Err(ServiceError::NotFound(entity)) => assert_eq!(entity.kind, EntityKind::Group),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        resources.create_project(path, &NameInput::named("Sneaky")),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn lists_under_missing_user_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let resources = service(&conn);
    let ghost = Uuid::new_v4();

    for result in [
        resources.list_groups(ghost).map(|_| ()),
        resources.list_quotes(ghost).map(|_| ()),
        resources.list_projects_for_user(ghost).map(|_| ()),
    ] {
        match result {
            Err(ServiceError::NotFound(entity)) => assert_eq!(entity.kind, EntityKind::User),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

#[test]
fn invalid_payload_is_rejected_before_any_write() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, "ana@example.com");
    let resources = service(&conn);

    let bad = TaskInput {
        name: Some("  ".to_string()),
        priority: Some("urgent".to_string()),
        ..TaskInput::default()
    };
    match resources.create_task(project, bad) {
        Err(ServiceError::ValidationFailed(errors)) => {
            assert!(errors.contains("name"));
            assert!(errors.contains("priority"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(resources.list_tasks(project).unwrap().is_empty());
}

#[test]
fn ownership_is_checked_before_payload() {
    let conn = open_db_in_memory().unwrap();
    let mine = seed_project(&conn, "ana@example.com");
    let other = seed_project(&conn, "bo@example.com");
    let resources = service(&conn);

    let mut path = mine;
    path.group_id = other.group_id;
    assert!(matches!(
        resources.update_project(path, &NameInput::named("")),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn deleting_group_leaves_sibling_groups_intact() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, "ana@example.com");
    let resources = service(&conn);
    let sibling = resources
        .create_group(project.user_id, &NameInput::named("Home"))
        .unwrap();
    let sibling_path = GroupPath {
        user_id: project.user_id,
        group_id: sibling.id,
    };
    let sibling_project = resources
        .create_project(sibling_path, &NameInput::named("Garden"))
        .unwrap();

    resources
        .delete_group(GroupPath {
            user_id: project.user_id,
            group_id: project.group_id,
        })
        .unwrap();

    assert!(matches!(
        resources.list_tasks(project),
        Err(ServiceError::NotFound(_))
    ));
    assert_eq!(
        resources.list_projects(sibling_path).unwrap(),
        vec![sibling_project]
    );
    assert_eq!(resources.list_groups(project.user_id).unwrap(), vec![sibling]);
}

#[test]
fn group_rename_keeps_absent_fields() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, "ana@example.com");
    let resources = service(&conn);
    let path = GroupPath {
        user_id: project.user_id,
        group_id: project.group_id,
    };

    let unchanged = resources.update_group(path, &NameInput::default()).unwrap();
    assert_eq!(unchanged.name, "Work");
    let renamed = resources
        .update_group(path, &NameInput::named("Office"))
        .unwrap();
    assert_eq!(renamed.name, "Office");
}

#[test]
fn quote_content_limit_is_500_characters() {
    let conn = open_db_in_memory().unwrap();
    let user_id = seed_user(&conn, "ana@example.com");
    let resources = service(&conn);

    let accepted = resources
        .create_quote(user_id, quote("é".repeat(500)))
        .unwrap();
    assert_eq!(accepted.content.chars().count(), 500);

    match resources.create_quote(user_id, quote("a".repeat(501))) {
        Err(ServiceError::ValidationFailed(errors)) => assert!(errors.contains("content")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(resources.list_quotes(user_id).unwrap(), vec![accepted]);
}

#[test]
fn foreign_quote_is_not_found_and_own_quote_updates() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "ana@example.com");
    let intruder = seed_user(&conn, "bo@example.com");
    let resources = service(&conn);
    let created = resources
        .create_quote(
            owner,
            QuoteInput {
                content: Some("Stay hungry.".to_string()),
                author: Some(Some("Jobs".to_string())),
            },
        )
        .unwrap();

    let foreign = QuotePath {
        user_id: intruder,
        quote_id: created.id,
    };
    assert!(matches!(
        resources.delete_quote(foreign),
        Err(ServiceError::NotFound(_))
    ));

    let own = QuotePath {
        user_id: owner,
        quote_id: created.id,
    };
    let cleared: QuoteInput = serde_json::from_value(serde_json::json!({"author": null})).unwrap();
    let updated = resources.update_quote(own, &cleared).unwrap();
    assert_eq!(updated.author, None);
    assert_eq!(updated.content, "Stay hungry.");

    resources.delete_quote(own).unwrap();
    assert!(resources.list_quotes(owner).unwrap().is_empty());
}

#[test]
fn attachment_delete_requires_full_chain() {
    let conn = open_db_in_memory().unwrap();
    let project = seed_project(&conn, "ana@example.com");
    let resources = service(&conn);
    let task = resources.create_task(project, named_task("Ship")).unwrap();
    let task_path: TaskPath = project.task(task.task.id);
    let attachment = resources
        .create_attachment(
            task_path,
            AttachmentInput {
                file: Some("brief.pdf".to_string()),
            },
        )
        .unwrap();

    let mut wrong = task_path;
    wrong.user_id = Uuid::new_v4();
    assert!(matches!(
        resources.delete_attachment(wrong.attachment(attachment.id)),
        Err(ServiceError::Forbidden(_))
    ));

    resources
        .delete_attachment(task_path.attachment(attachment.id))
        .unwrap();
    assert!(resources.list_attachments(task_path).unwrap().is_empty());

    let store = SqliteEntityStore::try_new(&conn).unwrap();
    assert_eq!(store.get_attachment(attachment.id).unwrap(), None);
}
