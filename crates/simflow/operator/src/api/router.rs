//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the health router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::liveness))
        .route("/readyz", get(handlers::readiness))
        .route("/status", get(handlers::operator_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
