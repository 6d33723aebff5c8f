//! User account model and account request models.
//!
//! # Invariants
//! - `email` is stored lowercased and is unique.
//! - `password_hash` is a PHC string; raw passwords never live on `User`.
//! - `external_id` is unique when present.

use crate::model::entity::EntityId;
use crate::model::validation::{
    normalize_email, required_text, ValidationErrors, MAX_NAME_CHARS, MIN_PASSWORD_CHARS,
};
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// Persisted user account.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    /// Absent for accounts created without a local password.
    pub password_hash: Option<String>,
    /// Subject id from the external identity provider.
    pub external_id: Option<String>,
    /// Storage reference of the current profile picture.
    pub profile_picture: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Debug for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("external_id", &self.external_id)
            .field("profile_picture", &self.profile_picture)
            .finish()
    }
}

/// Account payload for `register` and admin user creation.
#[derive(Clone, Default, Deserialize)]
pub struct RegisterUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

impl Debug for RegisterUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Validated account fields, password still raw and awaiting hashing.
#[derive(Clone)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
}

impl Debug for UserDraft {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDraft")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RegisterUser {
    /// Validates every field and collects all failures.
    ///
    /// `password_required = false` accepts an absent password but still
    /// checks one that is present.
    pub fn validate(&self, password_required: bool) -> Result<UserDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", self.name.as_deref(), MAX_NAME_CHARS);
        let email = normalize_email(&mut errors, self.email.as_deref());
        let password = self.validate_password(&mut errors, password_required);

        match (name, email) {
            (Some(name), Some(email)) if errors.is_empty() => Ok(UserDraft {
                name,
                email,
                password,
            }),
            _ => Err(errors),
        }
    }

    fn validate_password(
        &self,
        errors: &mut ValidationErrors,
        password_required: bool,
    ) -> Option<String> {
        let Some(password) = self.password.as_deref().filter(|value| !value.is_empty()) else {
            if password_required {
                errors.add("password", "The password field is required.");
            }
            return None;
        };

        if password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "password",
                format!("The password must be at least {MIN_PASSWORD_CHARS} characters."),
            );
            return None;
        }
        if let Some(confirmation) = self.password_confirmation.as_deref() {
            if confirmation != password {
                errors.add("password", "The password confirmation does not match.");
                return None;
            }
        }
        Some(password.to_string())
    }
}

/// Local login payload.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Presence check only; format problems surface as `Unauthorized`.
    pub fn validate(&self) -> Result<(String, String), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let password = self.password.as_deref().filter(|value| !value.is_empty());
        if email.is_none() {
            errors.add("email", "The email field is required.");
        }
        if password.is_none() {
            errors.add("password", "The password field is required.");
        }
        match (email, password) {
            (Some(email), Some(password)) => Ok((email.to_ascii_lowercase(), password.to_string())),
            _ => Err(errors),
        }
    }
}

/// Social login payload.
#[derive(Clone, Default, Deserialize)]
pub struct ExternalTokenInput {
    #[serde(alias = "token")]
    pub id_token: Option<String>,
}

impl Debug for ExternalTokenInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalTokenInput").finish_non_exhaustive()
    }
}

/// Claims returned by the identity provider for a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    /// Provider-stable subject id.
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    /// Remote picture URL, stored as the profile picture reference.
    pub picture: Option<String>,
}

impl VerifiedClaims {
    /// Display name, falling back to the email local part.
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| {
                self.email
                    .split('@')
                    .next()
                    .unwrap_or(self.email.as_str())
                    .to_string()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{RegisterUser, VerifiedClaims};

    fn payload(password: &str, confirmation: Option<&str>) -> RegisterUser {
        RegisterUser {
            name: Some("Ana".to_string()),
            email: Some("Ana@Example.com".to_string()),
            password: Some(password.to_string()),
            password_confirmation: confirmation.map(ToString::to_string),
        }
    }

    #[test]
    fn validate_normalizes_email_and_keeps_password() {
        let draft = payload("correct horse", Some("correct horse"))
            .validate(true)
            .unwrap();
        assert_eq!(draft.email, "ana@example.com");
        assert_eq!(draft.password.as_deref(), Some("correct horse"));
    }

    #[test]
    fn short_password_and_mismatched_confirmation_are_rejected() {
        let short = payload("short", None).validate(true).unwrap_err();
        assert!(short.contains("password"));

        let mismatch = payload("long enough", Some("different"))
            .validate(true)
            .unwrap_err();
        assert_eq!(
            mismatch.fields()["password"],
            vec!["The password confirmation does not match.".to_string()]
        );
    }

    #[test]
    fn all_field_errors_are_collected() {
        let errors = RegisterUser::default().validate(true).unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("email"));
        assert!(errors.contains("password"));
    }

    #[test]
    fn password_is_optional_when_not_required() {
        let mut input = payload("ignored", None);
        input.password = None;
        let draft = input.validate(false).unwrap();
        assert!(draft.password.is_none());
    }

    #[test]
    fn debug_output_redacts_password() {
        let draft = payload("super secret", None).validate(true).unwrap();
        let rendered = format!("{draft:?}");
        assert!(!rendered.contains("super secret"));
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let claims = VerifiedClaims {
            subject: "sub-1".to_string(),
            email: "ana@example.com".to_string(),
            name: Some("  ".to_string()),
            picture: None,
        };
        assert_eq!(claims.display_name(), "ana");
    }
}
