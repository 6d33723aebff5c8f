//! HTTP surface for TaskHub.
//!
//! # Responsibility
//! - Route requests to the core services and map their results to JSON.
//! - Own the shared SQLite connection and the external collaborators.
//!
//! # Invariants
//! - Every store interaction runs on the blocking pool under one lock.
//! - Token verification never runs while the store lock is held.

use std::sync::{Arc, Mutex};

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{delete, get, post, put};
use axum::Router;
use rusqlite::Connection;
use taskhub_core::{
    IdentityGateway, IdentityTokenVerifier, ImageStorage, ResourceService, ServiceError,
    ServiceResult, SqliteEntityStore, SqliteUserRepository,
};

pub mod config;
pub mod http;
pub mod storage;
pub mod verifier;

pub use config::ServerConfig;
use http::error::ApiError;
use http::handlers;

/// Single SQLite connection shared by all requests.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with exclusive access to the connection on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> ServiceResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| ServiceError::Internal("database lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
    }
}

/// Runs blocking work off the async executor.
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ApiError::internal(format!("blocking task failed: {err}")))?
        .map_err(ApiError::from)
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub verifier: Arc<dyn IdentityTokenVerifier>,
    pub storage: Arc<dyn ImageStorage>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        conn: Connection,
        verifier: Arc<dyn IdentityTokenVerifier>,
        storage: Arc<dyn ImageStorage>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            db: Database::new(conn),
            verifier,
            storage,
            max_body_bytes,
        }
    }

    /// Runs `f` against an identity gateway bound to the shared connection.
    pub async fn identity<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&IdentityGateway<'a, SqliteUserRepository<'a>>) -> ServiceResult<T>
            + Send
            + 'static,
    {
        let verifier = Arc::clone(&self.verifier);
        let storage = Arc::clone(&self.storage);
        self.db
            .run(move |conn| {
                let repo = SqliteUserRepository::try_new(conn)?;
                let gateway = IdentityGateway::new(repo, verifier.as_ref(), storage.as_ref());
                f(&gateway)
            })
            .await
    }

    /// Runs `f` against the resource service bound to the shared connection.
    pub async fn resources<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&ResourceService<SqliteEntityStore<'a>>) -> ServiceResult<T>
            + Send
            + 'static,
    {
        self.db
            .run(move |conn| {
                let service = ResourceService::new(SqliteEntityStore::try_new(conn)?);
                f(&service)
            })
            .await
    }
}

const GROUP: &str = "/users/:user_id/groups/:group_id";
const PROJECT: &str = "/users/:user_id/groups/:group_id/projects/:project_id";
const TASK: &str = "/users/:user_id/groups/:group_id/projects/:project_id/tasks/:task_id";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health::healthz))
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/users/:user_id", delete(handlers::users::delete_user))
        .route(
            "/users/:user_id/profile-picture",
            put(handlers::users::update_profile_picture),
        )
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/login/google", post(handlers::auth::login_with_google))
        .route(
            "/users/:user_id/projects",
            get(handlers::hierarchy::list_user_projects),
        )
        .route(
            "/users/:user_id/groups",
            get(handlers::hierarchy::list_groups).post(handlers::hierarchy::create_group),
        )
        .route(
            GROUP,
            put(handlers::hierarchy::update_group).delete(handlers::hierarchy::delete_group),
        )
        .route(
            &format!("{GROUP}/projects"),
            get(handlers::hierarchy::list_projects).post(handlers::hierarchy::create_project),
        )
        .route(
            PROJECT,
            put(handlers::hierarchy::update_project).delete(handlers::hierarchy::delete_project),
        )
        .route(
            &format!("{PROJECT}/tasks"),
            get(handlers::hierarchy::list_tasks).post(handlers::hierarchy::create_task),
        )
        .route(
            TASK,
            put(handlers::hierarchy::update_task).delete(handlers::hierarchy::delete_task),
        )
        .route(
            &format!("{TASK}/attachments"),
            get(handlers::hierarchy::list_attachments)
                .post(handlers::hierarchy::create_attachment),
        )
        .route(
            &format!("{TASK}/attachments/:attachment_id"),
            delete(handlers::hierarchy::delete_attachment),
        )
        .route(
            "/users/:user_id/quotes",
            get(handlers::quotes::list_quotes).post(handlers::quotes::create_quote),
        )
        .route(
            "/users/:user_id/quotes/:quote_id",
            get(handlers::quotes::show_quote)
                .put(handlers::quotes::update_quote)
                .delete(handlers::quotes::delete_quote),
        )
        .layer(from_fn(http::middleware::log_requests))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .with_state(state)
}
