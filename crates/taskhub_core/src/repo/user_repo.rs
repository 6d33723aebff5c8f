//! User account repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Email and external id uniqueness is enforced by unique indexes and
//!   surfaces as `RepoError::Conflict`.
//! - External-identity provisioning is a single upsert statement, so two
//!   concurrent logins for one subject can never produce two rows.

use crate::model::entity::{EntityId, EntityRef};
use crate::model::user::{User, VerifiedClaims};
use crate::repo::{ensure_connection_ready, parse_uuid, with_immediate_tx, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    password_hash,
    external_id,
    profile_picture,
    created_at,
    updated_at
FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<()>;
    fn get_user(&self, id: EntityId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn find_user_by_external_id(&self, external_id: &str) -> RepoResult<Option<User>>;
    fn list_users(&self) -> RepoResult<Vec<User>>;
    /// Replaces the stored picture reference and returns the previous one.
    /// `None` clears it.
    fn replace_profile_picture(
        &self,
        id: EntityId,
        reference: Option<&str>,
    ) -> RepoResult<Option<String>>;
    fn delete_user(&self, id: EntityId) -> RepoResult<()>;
    /// Inserts or refreshes the user bound to `claims.subject`.
    ///
    /// `placeholder_hash` is only written for a newly created row. An
    /// existing row keeps its picture when the claims carry none. Returns the
    /// stored user together with the picture reference it held before.
    fn upsert_external_user(
        &self,
        claims: &VerifiedClaims,
        placeholder_hash: &str,
    ) -> RepoResult<(User, Option<String>)>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_optional(&self, filter: &str, value: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE {filter} = ?1;"))?;
        let mut rows = stmt.query([value])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO users (
                id,
                name,
                email,
                password_hash,
                external_id,
                profile_picture
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash.as_deref(),
                user.external_id.as_deref(),
                user.profile_picture.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: EntityId) -> RepoResult<Option<User>> {
        self.query_optional("id", &id.to_string())
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.query_optional("email", &email.to_ascii_lowercase())
    }

    fn find_user_by_external_id(&self, external_id: &str) -> RepoResult<Option<User>> {
        self.query_optional("external_id", external_id)
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn replace_profile_picture(
        &self,
        id: EntityId,
        reference: Option<&str>,
    ) -> RepoResult<Option<String>> {
        with_immediate_tx(self.conn, || {
            let previous: Option<String> = self
                .get_user(id)?
                .ok_or(RepoError::NotFound(EntityRef::user(id)))?
                .profile_picture;
            self.conn.execute(
                "UPDATE users
                 SET profile_picture = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![id.to_string(), reference],
            )?;
            Ok(previous)
        })
    }

    fn delete_user(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::user(id)));
        }
        Ok(())
    }

    fn upsert_external_user(
        &self,
        claims: &VerifiedClaims,
        placeholder_hash: &str,
    ) -> RepoResult<(User, Option<String>)> {
        with_immediate_tx(self.conn, || {
            let previous = self
                .find_user_by_external_id(&claims.subject)?
                .and_then(|user| user.profile_picture);
            self.conn.execute(
                "INSERT INTO users (
                    id,
                    name,
                    email,
                    password_hash,
                    external_id,
                    profile_picture
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(external_id) DO UPDATE SET
                    name = excluded.name,
                    email = excluded.email,
                    profile_picture = COALESCE(excluded.profile_picture, users.profile_picture),
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    Uuid::new_v4().to_string(),
                    claims.display_name(),
                    claims.email.to_ascii_lowercase(),
                    placeholder_hash,
                    claims.subject,
                    claims.picture.as_deref(),
                ],
            )?;

            let user = self
                .find_user_by_external_id(&claims.subject)?
                .ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "upserted user for subject `{}` is not readable",
                        claims.subject
                    ))
                })?;
            Ok((user, previous))
        })
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: String = row.get("id")?;
    Ok(User {
        id: parse_uuid(&id, "users.id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        external_id: row.get("external_id")?,
        profile_picture: row.get("profile_picture")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
