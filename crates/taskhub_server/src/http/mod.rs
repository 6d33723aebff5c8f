//! HTTP layer: handlers, response shapes and error mapping.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod resources;
pub mod upload;
