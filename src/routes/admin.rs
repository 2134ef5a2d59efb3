use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// `/api/admin` is an ADMIN descriptor: the gate answers 404 to any other
/// signed-in role before these handlers run.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/routes
        // Route descriptors and legacy redirect table for the admin console.
        .route("/api/admin/routes", get(handlers::get_route_table))
}
