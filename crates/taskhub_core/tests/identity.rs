use std::collections::{BTreeMap, HashMap};
use std::sync::{Barrier, Mutex};
use std::thread;

use rusqlite::Connection;
use taskhub_core::db::{open_db, open_db_in_memory};
use taskhub_core::model::user::{Credentials, RegisterUser, VerifiedClaims};
use taskhub_core::{
    CollaboratorError, EntityRef, IdentityGateway, IdentityTokenVerifier, ImageFormat,
    ImageStorage, ImageUpload, ServiceError, SqliteUserRepository, UserRepository,
};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];
const GIF: &[u8] = b"GIF89a-tiny";

/// Token `"<subject>|<name>"` verifies; `"slow"` times out; anything else
/// is rejected.
struct FakeVerifier;

impl IdentityTokenVerifier for FakeVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedClaims, CollaboratorError> {
        if token == "slow" {
            return Err(CollaboratorError::Timeout("tokeninfo".to_string()));
        }
        let Some((subject, name)) = token.split_once('|') else {
            return Err(CollaboratorError::Rejected("malformed token".to_string()));
        };
        Ok(VerifiedClaims {
            subject: subject.to_string(),
            email: format!("{subject}@social.example"),
            name: Some(name.to_string()),
            picture: None,
        })
    }
}

#[derive(Default)]
struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_store: bool,
}

impl MemoryStorage {
    fn stored(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

impl ImageStorage for MemoryStorage {
    fn store(&self, bytes: &[u8], format: ImageFormat) -> Result<String, CollaboratorError> {
        if self.fail_store {
            return Err(CollaboratorError::Unavailable("disk full".to_string()));
        }
        let mut files = self.files.lock().unwrap();
        let reference = format!("mem/{}.{}", files.len(), format.extension());
        files.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    fn delete(&self, reference: &str) -> Result<(), CollaboratorError> {
        self.files.lock().unwrap().remove(reference);
        Ok(())
    }
}

fn registration(email: &str, password: &str) -> RegisterUser {
    RegisterUser {
        name: Some("Ana".to_string()),
        email: Some(email.to_string()),
        password: Some(password.to_string()),
        password_confirmation: Some(password.to_string()),
    }
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

fn gateway<'a>(
    conn: &'a Connection,
    storage: &'a MemoryStorage,
) -> IdentityGateway<'a, SqliteUserRepository<'a>> {
    IdentityGateway::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        &FakeVerifier,
        storage,
    )
}

#[test]
fn register_then_login_returns_same_user() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);

    let registered = identity
        .register(&registration("Ana@Example.com", "correct horse"), None)
        .unwrap();
    let logged_in = identity
        .login(&credentials("ana@example.com", "correct horse"))
        .unwrap();

    assert_eq!(registered.id, logged_in.id);
    assert_eq!(logged_in.email, "ana@example.com");
    assert!(logged_in
        .password_hash
        .as_deref()
        .is_some_and(|hash| hash.starts_with("$argon2id$")));
}

#[test]
fn login_failures_are_indistinguishable() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    identity
        .register(&registration("ana@example.com", "correct horse"), None)
        .unwrap();

    let wrong_password = identity
        .login(&credentials("ana@example.com", "wrong horse"))
        .unwrap_err();
    let unknown_email = identity
        .login(&credentials("nobody@example.com", "correct horse"))
        .unwrap_err();

    assert!(matches!(wrong_password, ServiceError::Unauthorized));
    assert!(matches!(unknown_email, ServiceError::Unauthorized));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[test]
fn duplicate_email_is_a_field_error() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    identity
        .register(&registration("ana@example.com", "correct horse"), None)
        .unwrap();

    match identity.register(&registration("ANA@example.com", "another pass"), None) {
        Err(ServiceError::ValidationFailed(errors)) => assert!(errors.contains("email")),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn register_collects_field_and_picture_errors() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    let picture = ImageUpload::new(b"%PDF-1.7".to_vec(), Some("application/pdf".to_string()));

    match identity.register(&RegisterUser::default(), Some(&picture)) {
        Err(ServiceError::ValidationFailed(errors)) => {
            for field in ["name", "email", "password", "profile_picture"] {
                assert!(errors.contains(field), "missing error for {field}");
            }
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(storage.stored().is_empty());
}

#[test]
fn admin_created_account_without_password_cannot_log_in() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);

    let input = RegisterUser {
        name: Some("Bo".to_string()),
        email: Some("bo@example.com".to_string()),
        ..RegisterUser::default()
    };
    let user = identity.create_user(&input).unwrap();
    assert!(user.password_hash.is_none());

    assert!(matches!(
        identity.login(&credentials("bo@example.com", "anything-at-all")),
        Err(ServiceError::Unauthorized)
    ));
}

#[test]
fn external_login_is_idempotent_and_refreshes_name() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);

    let first = identity.login_with_external_token("sub-1|Ana").unwrap();
    let second = identity.login_with_external_token("sub-1|Ana Maria").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "Ana Maria");
    assert_eq!(second.external_id.as_deref(), Some("sub-1"));
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_users().unwrap().len(), 1);

    assert!(matches!(
        identity.login(&credentials("sub-1@social.example", "password123")),
        Err(ServiceError::Unauthorized)
    ));
}

#[test]
fn external_login_maps_collaborator_failures() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);

    assert!(matches!(
        identity.login_with_external_token("garbage"),
        Err(ServiceError::Unauthorized)
    ));
    assert!(matches!(
        identity.login_with_external_token("   "),
        Err(ServiceError::Unauthorized)
    ));

    let timeout = identity.login_with_external_token("slow").unwrap_err();
    assert!(timeout.is_retryable());
    assert!(matches!(timeout, ServiceError::Upstream { .. }));
}

#[test]
fn external_picture_is_kept_when_claims_omit_one() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);

    let mut claims = VerifiedClaims {
        subject: "sub-9".to_string(),
        email: "nine@social.example".to_string(),
        name: None,
        picture: Some("https://img.example/nine.png".to_string()),
    };
    let first = identity.provision_external_user(&claims).unwrap();
    assert_eq!(first.name, "nine");

    claims.picture = None;
    let second = identity.provision_external_user(&claims).unwrap();
    assert_eq!(
        second.profile_picture.as_deref(),
        Some("https://img.example/nine.png")
    );
}

#[test]
fn external_picture_replaces_and_discards_uploaded_file() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);

    let mut claims = VerifiedClaims {
        subject: "sub-4".to_string(),
        email: "four@social.example".to_string(),
        name: Some("Four".to_string()),
        picture: None,
    };
    let user = identity.provision_external_user(&claims).unwrap();
    let uploaded = identity
        .update_profile_picture(user.id, &ImageUpload::new(PNG.to_vec(), None))
        .unwrap()
        .profile_picture
        .unwrap();
    assert_eq!(storage.stored(), vec![uploaded.clone()]);

    let kept = identity.provision_external_user(&claims).unwrap();
    assert_eq!(kept.profile_picture.as_deref(), Some(uploaded.as_str()));
    assert_eq!(storage.stored(), vec![uploaded]);

    claims.picture = Some("https://img.example/four.png".to_string());
    let refreshed = identity.provision_external_user(&claims).unwrap();
    assert_eq!(refreshed.id, user.id);
    assert_eq!(
        refreshed.profile_picture.as_deref(),
        Some("https://img.example/four.png")
    );
    assert!(storage.stored().is_empty());
}

#[test]
fn concurrent_external_logins_share_one_user() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskhub.db");
    let connections = [open_db(&path).unwrap(), open_db(&path).unwrap()];
    let storage = MemoryStorage::default();
    let barrier = Barrier::new(connections.len());
    let claims = VerifiedClaims {
        subject: "sub-race".to_string(),
        email: "race@social.example".to_string(),
        name: Some("Race".to_string()),
        picture: None,
    };

    let ids: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = connections
            .into_iter()
            .map(|conn| {
                let (storage, barrier, claims) = (&storage, &barrier, &claims);
                scope.spawn(move || {
                    let identity = gateway(&conn, storage);
                    barrier.wait();
                    identity.provision_external_user(claims).unwrap().id
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(ids[0], ids[1]);
    let check = open_db(&path).unwrap();
    let users = SqliteUserRepository::try_new(&check)
        .unwrap()
        .list_users()
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].external_id.as_deref(), Some("sub-race"));
}

#[test]
fn profile_picture_swap_removes_previous_file() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    let user = identity
        .register(
            &registration("ana@example.com", "correct horse"),
            Some(&ImageUpload::new(PNG.to_vec(), Some("image/png".to_string()))),
        )
        .unwrap();
    let original = user.profile_picture.clone().unwrap();
    assert_eq!(storage.stored(), vec![original.clone()]);

    let updated = identity
        .update_profile_picture(user.id, &ImageUpload::new(GIF.to_vec(), None))
        .unwrap();

    let current = updated.profile_picture.unwrap();
    assert_ne!(current, original);
    assert!(current.ends_with(".gif"));
    assert_eq!(storage.stored(), vec![current]);
}

#[test]
fn failed_picture_upload_leaves_user_untouched() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    let user = identity
        .register(&registration("ana@example.com", "correct horse"), None)
        .unwrap();

    let failing = MemoryStorage {
        fail_store: true,
        ..MemoryStorage::default()
    };
    let failing_identity = gateway(&conn, &failing);
    let err = failing_identity
        .update_profile_picture(user.id, &ImageUpload::new(PNG.to_vec(), None))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream { .. }));

    let invalid = identity
        .update_profile_picture(user.id, &ImageUpload::new(Vec::new(), None))
        .unwrap_err();
    assert!(matches!(invalid, ServiceError::ValidationFailed(_)));

    assert_eq!(identity.get_user(user.id).unwrap().profile_picture, None);
}

#[test]
fn picture_update_for_missing_user_stores_nothing() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    let ghost = uuid::Uuid::new_v4();

    match identity.update_profile_picture(ghost, &ImageUpload::new(PNG.to_vec(), None)) {
        Err(ServiceError::NotFound(entity)) => assert_eq!(entity, EntityRef::user(ghost)),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(storage.stored().is_empty());
}

#[test]
fn delete_user_removes_row_and_picture() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    let user = identity
        .register(
            &registration("ana@example.com", "correct horse"),
            Some(&ImageUpload::new(PNG.to_vec(), None)),
        )
        .unwrap();

    identity.delete_user(user.id).unwrap();

    assert!(storage.stored().is_empty());
    assert!(matches!(
        identity.get_user(user.id),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        identity.delete_user(user.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn users_are_listed_in_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let storage = MemoryStorage::default();
    let identity = gateway(&conn, &storage);
    let mut expected = HashMap::new();
    for email in ["a@example.com", "b@example.com"] {
        let user = identity
            .register(&registration(email, "correct horse"), None)
            .unwrap();
        expected.insert(user.id, email);
    }

    let listed = identity.list_users().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].email, "a@example.com");
    assert!(listed.iter().all(|user| expected[&user.id] == user.email));
}
