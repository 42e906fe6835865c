pub mod documents;
pub mod health;
pub mod search;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{middleware, routing::get, routing::post, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::request_logger;
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origin);
    let body_limit = state.config.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/index", post(documents::index_documents))
        .route("/upload-document", post(documents::upload_document))
        .route("/search", post(search::search))
        .route("/search-suggestions", get(search::search_suggestions))
        .route("/document-stats", get(search::document_stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// One trusted origin with credentials. Credentialed CORS forbids wildcard
/// methods and headers, so both are mirrored from the preflight instead.
fn build_cors(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}
