//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the error taxonomy every outer surface maps to responses.

use crate::model::entity::EntityRef;
use crate::model::validation::ValidationErrors;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod external;
pub mod identity;
pub mod ownership;
pub mod password;
pub mod resource_service;

use external::CollaboratorError;
use ownership::OwnershipError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Use-case error taxonomy.
#[derive(Debug)]
pub enum ServiceError {
    /// Entity (or an addressed ancestor) does not exist.
    NotFound(EntityRef),
    /// The asserted ownership chain does not match the stored one.
    Forbidden(EntityRef),
    ValidationFailed(ValidationErrors),
    /// Credential or token failure. Deliberately carries no detail.
    Unauthorized,
    /// An external collaborator failed or timed out.
    Upstream {
        collaborator: &'static str,
        error: CollaboratorError,
    },
    Repo(RepoError),
    Internal(String),
}

impl ServiceError {
    pub(crate) fn upstream(collaborator: &'static str) -> impl FnOnce(CollaboratorError) -> Self {
        move |error| Self::Upstream {
            collaborator,
            error,
        }
    }

    /// Whether a caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { error, .. } if error.is_retryable())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{} not found", entity.kind.label()),
            Self::Forbidden(entity) => write!(f, "ownership chain mismatch for {entity}"),
            Self::ValidationFailed(errors) => write!(f, "{errors}"),
            Self::Unauthorized => write!(f, "invalid credentials"),
            Self::Upstream {
                collaborator,
                error,
            } => write!(f, "{collaborator} failed: {error}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ValidationFailed(errors) => Some(errors),
            Self::Upstream { error, .. } => Some(error),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            RepoError::Conflict { field } => Self::ValidationFailed(ValidationErrors::single(
                field,
                format!("The {field} has already been taken."),
            )),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(value: ValidationErrors) -> Self {
        Self::ValidationFailed(value)
    }
}

impl From<OwnershipError> for ServiceError {
    fn from(value: OwnershipError) -> Self {
        match value {
            OwnershipError::NotFound(entity) => Self::NotFound(entity),
            OwnershipError::Forbidden { target, .. } => Self::Forbidden(target),
            OwnershipError::Repo(err) => err.into(),
        }
    }
}
