//! Field-level validation shared by all request models.
//!
//! # Invariants
//! - Errors are keyed by the wire field name.
//! - Messages per field keep insertion order; fields are sorted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_NAME_CHARS: usize = 255;
pub const MAX_EMAIL_CHARS: usize = 255;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_QUOTE_CONTENT_CHARS: usize = 500;
pub const MAX_QUOTE_AUTHOR_CHARS: usize = 100;
pub const MAX_FILE_REFERENCE_CHARS: usize = 1024;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("valid email regex")
});

/// Field-level validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single-field failure.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when no field failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed")?;
        for (index, (field, messages)) in self.fields.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

/// Trims and checks a required name-like field.
///
/// Returns the normalized value when valid; records an error otherwise.
pub fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Option<String> {
    let Some(raw) = value else {
        errors.add(field, format!("The {field} field is required."));
        return None;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("The {field} field is required."));
        return None;
    }
    if trimmed.chars().count() > max_chars {
        errors.add(
            field,
            format!("The {field} may not be greater than {max_chars} characters."),
        );
        return None;
    }
    Some(trimmed.to_string())
}

/// Checks an optional free-text field; blank input normalizes to `None`.
pub fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> Option<String> {
    let trimmed = value.map(str::trim).filter(|value| !value.is_empty())?;
    if trimmed.chars().count() > max_chars {
        errors.add(
            field,
            format!("The {field} may not be greater than {max_chars} characters."),
        );
        return None;
    }
    Some(trimmed.to_string())
}

/// Validates and lowercases an email address.
pub fn normalize_email(errors: &mut ValidationErrors, value: Option<&str>) -> Option<String> {
    let email = required_text(errors, "email", value, MAX_EMAIL_CHARS)?;
    if !is_valid_email(&email) {
        errors.add("email", "The email must be a valid email address.");
        return None;
    }
    Some(email.to_ascii_lowercase())
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Deserializes a field that distinguishes "absent" from explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`:
/// absent => `None`, `null` => `Some(None)`, value => `Some(Some(v))`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
