use rusqlite::Connection;
use taskhub_core::db::open_db_in_memory;
use taskhub_core::model::hierarchy::{Attachment, Group, Priority, Project, Task, TaskStatus};
use taskhub_core::model::quote::Quote;
use taskhub_core::model::user::User;
use taskhub_core::repo::entity_repo::ParentLink;
use taskhub_core::{
    EntityRef, EntityStore, RepoError, SqliteEntityStore, SqliteUserRepository, UserRepository,
};
use uuid::Uuid;

fn seed_user(conn: &Connection, email: &str) -> Uuid {
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    let user = User {
        id: Uuid::new_v4(),
        name: "Seed".to_string(),
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

fn sample_task(project_id: Uuid, name: &str) -> Task {
    Task {
        id: Uuid::new_v4(),
        project_id,
        name: name.to_string(),
        description: Some("details".to_string()),
        deadline: Some(1_700_000_000_000),
        reminder: None,
        priority: Priority::High,
        status: TaskStatus::InProgress,
    }
}

#[test]
fn store_requires_migrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    match SqliteEntityStore::try_new(&conn) {
        Err(RepoError::UninitializedConnection { actual_version, .. }) => {
            assert_eq!(actual_version, 0)
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
}

#[test]
fn hierarchy_round_trip_preserves_fields() {
    let conn = open_db_in_memory().unwrap();
    let user_id = seed_user(&conn, "ana@example.com");
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let group = Group::new(user_id, "Work");
    store.create_group(&group).unwrap();
    let project = Project::new(group.id, "Launch");
    store.create_project(&project).unwrap();
    let task = sample_task(project.id, "Write release notes");
    store.create_task(&task).unwrap();
    let attachment = Attachment {
        id: Uuid::new_v4(),
        task_id: task.id,
        file: "notes.pdf".to_string(),
    };
    store.create_attachment(&attachment).unwrap();

    assert_eq!(store.get_group(group.id).unwrap(), Some(group.clone()));
    assert_eq!(store.get_project(project.id).unwrap(), Some(project));
    assert_eq!(store.get_task(task.id).unwrap(), Some(task.clone()));
    assert_eq!(
        store.list_attachments(task.id).unwrap(),
        vec![attachment.clone()]
    );
    assert_eq!(
        store.parent_link(EntityRef::attachment(attachment.id)).unwrap(),
        ParentLink::Parent(EntityRef::task(task.id))
    );
    assert_eq!(
        store.parent_link(EntityRef::user(user_id)).unwrap(),
        ParentLink::Root
    );
}

#[test]
fn lists_follow_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let user_id = seed_user(&conn, "ana@example.com");
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let names = ["zeta", "alpha", "mid"];
    for name in names {
        store.create_group(&Group::new(user_id, name)).unwrap();
    }

    let listed: Vec<String> = store
        .list_groups(user_id)
        .unwrap()
        .into_iter()
        .map(|group| group.name)
        .collect();
    assert_eq!(listed, names);
}

#[test]
fn projects_for_user_span_all_groups_only_of_that_user() {
    let conn = open_db_in_memory().unwrap();
    let owner = seed_user(&conn, "owner@example.com");
    let other = seed_user(&conn, "other@example.com");
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let work = Group::new(owner, "Work");
    let home = Group::new(owner, "Home");
    let foreign = Group::new(other, "Elsewhere");
    for group in [&work, &home, &foreign] {
        store.create_group(group).unwrap();
    }
    store.create_project(&Project::new(work.id, "A")).unwrap();
    store.create_project(&Project::new(home.id, "B")).unwrap();
    store.create_project(&Project::new(foreign.id, "C")).unwrap();

    let names: Vec<String> = store
        .list_projects_for_user(owner)
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn deleting_group_cascades_to_descendants() {
    let conn = open_db_in_memory().unwrap();
    let user_id = seed_user(&conn, "ana@example.com");
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let group = Group::new(user_id, "Work");
    store.create_group(&group).unwrap();
    let project = Project::new(group.id, "Launch");
    store.create_project(&project).unwrap();
    let task = sample_task(project.id, "Ship");
    store.create_task(&task).unwrap();

    store.delete_entity(EntityRef::group(group.id)).unwrap();

    assert_eq!(store.get_project(project.id).unwrap(), None);
    assert_eq!(
        store.parent_link(EntityRef::task(task.id)).unwrap(),
        ParentLink::Missing
    );
}

#[test]
fn missing_rows_report_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let ghost = EntityRef::task(Uuid::new_v4());

    assert!(matches!(
        store.delete_entity(ghost),
        Err(RepoError::NotFound(entity)) if entity == ghost
    ));
    let task = sample_task(Uuid::new_v4(), "ghost");
    assert!(matches!(
        store.update_task(&task),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn null_parent_is_reported_as_orphaned() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let project_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO projects (id, group_id, name) VALUES (?1, NULL, 'Loose');",
        [project_id.to_string()],
    )
    .unwrap();

    assert_eq!(
        store.parent_link(EntityRef::project(project_id)).unwrap(),
        ParentLink::Orphaned
    );
    assert!(matches!(
        store.get_project(project_id),
        Err(RepoError::InvalidData(_))
    ));
}

#[test]
fn atomically_rolls_back_on_error() {
    let conn = open_db_in_memory().unwrap();
    let user_id = seed_user(&conn, "ana@example.com");
    let store = SqliteEntityStore::try_new(&conn).unwrap();
    let group = Group::new(user_id, "Doomed");

    let result: Result<(), RepoError> = store.atomically(|store| {
        store.create_group(&group)?;
        Err(RepoError::InvalidData("abort".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(store.get_group(group.id).unwrap(), None);
}

#[test]
fn quotes_round_trip_and_update() {
    let conn = open_db_in_memory().unwrap();
    let user_id = seed_user(&conn, "ana@example.com");
    let store = SqliteEntityStore::try_new(&conn).unwrap();

    let mut quote = Quote {
        id: Uuid::new_v4(),
        user_id,
        content: "Simplicity is prerequisite for reliability.".to_string(),
        author: Some("Dijkstra".to_string()),
    };
    store.create_quote(&quote).unwrap();

    quote.author = None;
    store.update_quote(&quote).unwrap();

    assert_eq!(store.list_quotes(user_id).unwrap(), vec![quote]);
}
