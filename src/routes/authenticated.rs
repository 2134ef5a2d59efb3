use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Every path here is classified `Authenticated`, so the gate has already
/// redirected anonymous visitors to the login page. Handlers read the
/// resolved identity through the `Identity` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /tableau-de-bord
        // Role dispatch to the admin, instructor or student dashboard.
        .route("/tableau-de-bord", get(handlers::dashboard_entry))
        // GET /learn/{course_id}
        // Old learning URL; resolves a course id to its slug.
        .route("/learn/{course_id}", get(handlers::learn_redirect))
        // GET /api/me
        .route("/api/me", get(handlers::get_me))
        // GET /api/courses/{course_id}/phase3-access
        .route(
            "/api/courses/{course_id}/phase3-access",
            get(handlers::get_phase3_access),
        )
        // GET /api/courses/{course_id}/weekly-plan
        .route(
            "/api/courses/{course_id}/weekly-plan",
            get(handlers::get_weekly_plan),
        )
}
