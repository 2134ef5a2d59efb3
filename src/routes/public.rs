use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Served without session resolution or gating.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
}
