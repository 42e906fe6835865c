use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Logs one line per request; server errors are raised to `warn`.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        warn!(%method, %path, status, duration_ms, "Request failed");
    } else {
        info!(%method, %path, status, duration_ms, "Request completed");
    }

    response
}
