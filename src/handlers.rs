use crate::{
    AppState,
    classifier::{self, Capability},
    derivations,
    gate::{self, dispatch_role},
    models::{
        DerivationResult, Identity, LegacyRouteView, MeResponse, Phase3Access, RouteDescriptorView,
        RouteTableResponse, WeeklyPlan,
    },
    redirects::{self, LEARN_FORWARDED, with_query},
};
use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::Redirect,
};
use std::collections::HashMap;
use uuid::Uuid;

fn derivation_status<T>(result: &DerivationResult<T>) -> StatusCode {
    if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// dashboard_entry
///
/// [Authenticated Route] Generic dashboard entry point: sends the user to the
/// home page of their role.
#[utoipa::path(
    get,
    path = "/tableau-de-bord",
    responses((status = 303, description = "Redirect to the role's dashboard"))
)]
pub async fn dashboard_entry(identity: Identity) -> Redirect {
    let destination = dispatch_role(&identity.role);
    tracing::debug!(user_id = %identity.user_id, role = %identity.role, destination, "Dashboard dispatch");
    Redirect::to(destination)
}

/// learn_redirect
///
/// [Authenticated Route] Old learning URLs take either a course id or a slug.
/// Ids are resolved to the slug; an id without a slug (or a failed lookup)
/// falls back to the course page.
#[utoipa::path(
    get,
    path = "/learn/{course_id}",
    params(("course_id" = String, Path, description = "Course UUID or slug")),
    responses((status = 303, description = "Redirect to the learning interface"))
)]
pub async fn learn_redirect(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> Redirect {
    let query: HashMap<String, String> =
        serde_urlencoded::from_str(raw_query.as_deref().unwrap_or_default()).unwrap_or_default();
    let segment = redirects::encode_segment(&course_id);

    let target = match Uuid::parse_str(&course_id) {
        Ok(id) => match state.repo.get_course_slug(id).await {
            Ok(Some(slug)) => format!("/apprendre/{}", redirects::encode_segment(&slug)),
            Ok(None) => format!("/formations/{segment}"),
            Err(e) => {
                // Lookup failures land on the bare course page.
                tracing::error!(%course_id, error = %e, "Error redirecting /learn route");
                return Redirect::to(&format!("/formations/{segment}"));
            }
        },
        Err(_) => format!("/apprendre/{segment}"),
    };

    Redirect::to(&with_query(&target, &query, LEARN_FORWARDED))
}

/// get_me
///
/// [Authenticated Route] Resolved identity of the current session.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Current identity", body = MeResponse))
)]
pub async fn get_me(identity: Identity) -> Json<MeResponse> {
    Json(MeResponse {
        id: identity.user_id,
        landing_path: dispatch_role(&identity.role).to_string(),
        role: identity.role.to_string(),
        email: identity.email,
    })
}

/// get_phase3_access
///
/// [Authenticated Route] Phase-3 gate for the current user on a course.
#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/phase3-access",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Access computed", body = DerivationResult<Phase3Access>),
        (status = 500, description = "Derivation failed", body = DerivationResult<Phase3Access>)
    )
)]
pub async fn get_phase3_access(
    identity: Identity,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> (StatusCode, Json<DerivationResult<Phase3Access>>) {
    let result = derivations::compute_access(
        state.repo.as_ref(),
        state.config.phase3_policy,
        identity.user_id,
        course_id,
    )
    .await;
    (derivation_status(&result), Json(result))
}

/// get_weekly_plan
///
/// [Authenticated Route] Weekly study plan of the current user on a course.
/// An unconfigured plan is a successful `unavailable` result.
#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/weekly-plan",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Plan computed", body = DerivationResult<WeeklyPlan>),
        (status = 500, description = "Derivation failed", body = DerivationResult<WeeklyPlan>)
    )
)]
pub async fn get_weekly_plan(
    identity: Identity,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> (StatusCode, Json<DerivationResult<WeeklyPlan>>) {
    let result = derivations::weekly_plan(state.repo.as_ref(), identity.user_id, course_id).await;
    (derivation_status(&result), Json(result))
}

/// get_route_table
///
/// [Admin Route] The gate's route descriptors and the legacy redirect table,
/// for the admin console.
#[utoipa::path(
    get,
    path = "/api/admin/routes",
    responses((status = 200, description = "Routing tables", body = RouteTableResponse))
)]
pub async fn get_route_table(identity: Identity) -> Json<RouteTableResponse> {
    tracing::debug!(user_id = %identity.user_id, "Route table requested");

    let descriptors = classifier::PUBLIC_ROOTS
        .iter()
        .map(|root| RouteDescriptorView {
            root: root.to_string(),
            capability: Capability::Public,
        })
        .chain(classifier::protected_descriptors().iter().map(|descriptor| {
            RouteDescriptorView {
                root: descriptor.root.to_string(),
                capability: descriptor.capability,
            }
        }))
        .collect();

    let legacy = redirects::LEGACY_ROUTES
        .iter()
        .map(|route| LegacyRouteView {
            pattern: route.pattern.to_string(),
            target: route.target.to_string(),
            forwarded: route.forwarded.iter().map(|name| name.to_string()).collect(),
        })
        .collect();

    Json(RouteTableResponse {
        descriptors,
        legacy,
        login_path: gate::LOGIN_PATH.to_string(),
    })
}
