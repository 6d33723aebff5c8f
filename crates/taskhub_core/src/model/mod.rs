//! Domain model for the user-owned task hierarchy.
//!
//! # Responsibility
//! - Define the records persisted by the entity store.
//! - Define create/update request models and their field validation.
//!
//! # Invariants
//! - Every entity is identified by a server-assigned `EntityId`.
//! - Every non-user entity has exactly one owning parent, fixed at creation.

pub mod entity;
pub mod hierarchy;
pub mod quote;
pub mod user;
pub mod validation;
