//! TaskHub HTTP server entry point.

use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};
use taskhub_core::{core_version, init_logging, open_db, IdentityTokenVerifier, ImageStorage};
use taskhub_server::storage::LocalImageStorage;
use taskhub_server::verifier::HttpTokenVerifier;
use taskhub_server::{build_router, AppState, ServerConfig};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=server_exit module=main status=error error={message}");
            eprintln!("taskhub-server: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = ServerConfig::from_env()?;
    init_logging(&config.log_level, &config.log_dir).map_err(|err| err.to_string())?;

    // The blocking HTTP client must be created and finally dropped outside
    // the async runtime, so `main` keeps its own handle.
    let verifier = Arc::new(
        HttpTokenVerifier::new(
            config.verifier_url.clone(),
            config.verifier_audience.clone(),
            config.verifier_timeout,
        )
        .map_err(|err| err.to_string())?,
    );
    let storage = LocalImageStorage::new(&config.storage_dir).map_err(|err| err.to_string())?;
    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;

    let state = AppState::new(
        conn,
        Arc::clone(&verifier) as Arc<dyn IdentityTokenVerifier>,
        Arc::new(storage) as Arc<dyn ImageStorage>,
        config.max_body_bytes,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("runtime: {err}"))?;
    let served = runtime.block_on(serve(config, state));
    drop(runtime);
    drop(verifier);
    served
}

async fn serve(config: ServerConfig, state: AppState) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| format!("bind {}: {err}", config.bind))?;
    info!(
        "event=server_start module=main status=ok bind={} db={} version={}",
        config.bind,
        config.db_path.display(),
        core_version()
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("serve: {err}"))?;

    info!("event=server_stop module=main status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=shutdown_signal module=main status=error error={err}");
    }
}
