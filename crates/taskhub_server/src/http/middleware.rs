use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use log::info;

/// Emits one `http_request` line per request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    info!(
        "event=http_request module=http status={} method={} path={} http_status={} duration_ms={}",
        if status.is_server_error() { "error" } else { "ok" },
        method,
        path,
        status.as_u16(),
        started_at.elapsed().as_millis()
    );
    response
}
