pub mod health;
pub mod ingest;
pub mod prompt;

use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::{bearer_auth, request_logger};
use crate::api::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);

    Router::new()
        .route("/", get(health::health_check))
        .nest("/api", api_routes(state.clone()))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/status", get(health::status))
        .route("/prompt", post(prompt::prompt_handler))
        .route("/search", post(prompt::search_handler))
        .route("/ingest", post(ingest::ingest_handler))
        .route("/ingest/jobs/{job_id}", get(ingest::get_job_status))
        .route("/documents/{*id}", delete(ingest::delete_document))
        .route_layer(middleware::from_fn_with_state(state, bearer_auth))
}
