//! Password hashing with Argon2id.
//!
//! Hashes are PHC strings; verification reads parameters back from them.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::service::{ServiceError, ServiceResult};

/// Hash compared against when the account does not exist, so unknown and
/// known emails take the same time to reject.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password(&Uuid::new_v4().simple().to_string()).ok());

pub fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::Internal(format!("password hashing failed: {err}")))
}

/// Returns `false` for a wrong password and for an unparseable hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Burns one verification against a throwaway hash.
pub fn verify_against_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// Hash of a random secret nobody knows, for accounts created through
/// external identity.
pub fn placeholder_hash() -> ServiceResult<String> {
    hash_password(&format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    ))
}
