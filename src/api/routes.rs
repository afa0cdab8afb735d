use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::middleware::{make_request_span, request_context_middleware};

use super::handlers;
use super::AppState;

/// Upper bound on uploaded clip size
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Recommendation pipeline
        .route("/api/v1/recommend", post(handlers::recommend))
        .route("/api/v1/recommend/upload", post(handlers::recommend_upload))
        // Retained artifacts (shared with the separation feature)
        .nest_service("/media", ServeDir::new(&state.media_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
