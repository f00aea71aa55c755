//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{download, fetch, health, jobs, process, upload};
use crate::state::AppState;

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_size);

    Router::new()
        .route("/upload", post(upload::upload))
        .route("/fetch", post(fetch::fetch))
        .route("/process", post(process::process))
        .route("/status/:job_id", get(process::status))
        .route("/download/:job_id/:file", get(download::download_file))
        .route("/download-all/:job_id", get(download::download_all))
        .route("/cancel/:job_id", post(jobs::cancel))
        .route("/cleanup/:job_id", delete(jobs::cleanup))
        .route("/health", get(health))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(parsed)
    }
}
