//! Core domain logic for TaskHub.
//! This crate owns the entity hierarchy, ownership rules and identity.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{EntityId, EntityKind, EntityRef};
pub use model::validation::ValidationErrors;
pub use repo::entity_repo::{EntityStore, SqliteEntityStore};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::external::{
    CollaboratorError, IdentityTokenVerifier, ImageFormat, ImageStorage, ImageUpload,
};
pub use service::identity::IdentityGateway;
pub use service::resource_service::ResourceService;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
