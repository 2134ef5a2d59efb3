use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::{HeaderName, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::collections::HashMap;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request pipeline: session, classification, gate, legacy redirects.
pub mod auth;
pub mod classifier;
pub mod gate;
pub mod redirects;

// Data access and derived views.
pub mod derivations;
pub mod instrument;
pub mod models;
pub mod repository;

pub mod config;
pub mod error;
pub mod handlers;
pub mod proxy;

// Locally served endpoints, grouped by the capability they sit behind.
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use instrument::InstrumentedRepository;
pub use repository::{PostgresRepository, RepositoryState};

use error::AppError;
use gate::Decision;

/// ApiDoc
///
/// OpenAPI document for the endpoints this service answers itself.
/// Everything else is proxied to the renderer and documented there.
/// Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::dashboard_entry, handlers::learn_redirect, handlers::get_me,
        handlers::get_phase3_access, handlers::get_weekly_plan, handlers::get_route_table
    ),
    components(
        schemas(
            models::MeResponse, models::ModuleRef, models::Phase3Access, models::PlanTask,
            models::WeekPlan, models::WeeklyPlan, models::WeekPhase, models::TaskType,
            models::TaskStatus, models::RouteDescriptorView, models::LegacyRouteView,
            models::RouteTableResponse, classifier::Capability,
        )
    ),
    tags(
        (name = "dojo-portal", description = "Le Dojo Financier gateway API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable state handed to the gate middleware, every local handler
/// and the renderer proxy.
#[derive(Clone)]
pub struct AppState {
    /// Enrollment, progress and identity store.
    pub repo: RepositoryState,
    pub config: AppConfig,
    /// Client used to reach the renderer. Never follows redirects.
    pub http: reqwest::Client,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// gate_middleware
///
/// Runs in front of every gated route and the renderer fallback:
///
/// 1. Resolve the session (never fails; anonymous on any problem).
/// 2. Classify the path into its required capability.
/// 3. Authorize: `Redirect` becomes a 303 to the login page, `Deny` a 404.
/// 4. Legacy paths are redirected to their canonical form.
/// 5. Otherwise the session is stored in the request extensions for the
///    `Identity` extractor and the proxy.
///
/// A refreshed session cookie is attached to the response whatever the outcome.
async fn gate_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = auth::resolve_session(request.headers(), &state.repo, &state.config).await;
    let refreshed_cookie = session.refreshed_cookie.clone();

    let uri = request.uri().clone();
    let path = uri.path();
    let requested = uri.path_and_query().map_or(path, |pq| pq.as_str());

    let capability = classifier::classify(path);
    let decision = gate::authorize(session.identity.as_ref(), capability, requested);

    let mut response = match decision {
        Decision::Allow => {
            let query: HashMap<String, String> =
                serde_urlencoded::from_str(uri.query().unwrap_or_default()).unwrap_or_default();

            match redirects::canonical_target(path, &query) {
                Some(destination) => {
                    tracing::debug!(from = %path, to = %destination, "Legacy path redirect");
                    Redirect::to(&destination).into_response()
                }
                None => {
                    request.extensions_mut().insert(session);
                    next.run(request).await
                }
            }
        }
        Decision::Redirect { destination } => {
            tracing::debug!(%path, ?capability, "Anonymous request, redirecting to login");
            Redirect::to(&destination).into_response()
        }
        Decision::Deny { reason } => {
            tracing::info!(%path, %reason, "Access denied");
            AppError::NotFound.into_response()
        }
    };

    if let Some(cookie) = refreshed_cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// create_router
///
/// Assembles the full routing structure. Health and API docs sit outside the
/// gate; local handlers and the renderer fallback sit behind it.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // Every request reaching this router goes through the gate, including the
    // proxy fallback.
    let gated = Router::new()
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(state.clone(), gate_middleware));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(gated)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with the `x-request-id` set above so
/// every log line of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
