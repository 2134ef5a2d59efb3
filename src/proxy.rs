//! Renderer proxy. Requests the gate allowed and no local handler claims are
//! forwarded to the page renderer, annotated with the resolved identity.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::Response,
};
use reqwest::redirect::Policy;

use crate::{AppState, auth::Session, classifier::chrome_for, error::AppError};

// Request bodies above this size are refused rather than buffered.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");
pub const ROUTE_CHROME_HEADER: HeaderName = HeaderName::from_static("x-route-chrome");

static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
];

/// renderer_client
///
/// HTTP client for the renderer. Redirects are relayed to the browser, never followed.
pub fn renderer_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().redirect(Policy::none()).build()
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// forward
///
/// Fallback handler. Identity headers are always rewritten from the resolved
/// session; client-supplied values never reach the renderer.
pub async fn forward(State(state): State<AppState>, request: Request) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.config.renderer_url, path_and_query);

    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::MalformedPayload)?;

    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(&USER_ID_HEADER);
    headers.remove(&USER_ROLE_HEADER);

    if let Some(identity) = parts
        .extensions
        .get::<Session>()
        .and_then(|session| session.identity.as_ref())
    {
        if let Ok(value) = HeaderValue::from_str(&identity.user_id.to_string()) {
            headers.insert(USER_ID_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(identity.role.as_str()) {
            headers.insert(USER_ROLE_HEADER, value);
        }
    }
    headers.insert(
        ROUTE_CHROME_HEADER,
        HeaderValue::from_static(chrome_for(parts.uri.path()).as_str()),
    );

    let upstream = state
        .http
        .request(parts.method.clone(), &url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(%url, error = %e, "Renderer request failed");
            AppError::Upstream(e.to_string())
        })?;

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut response_headers);
    response_headers.remove(header::CONTENT_LENGTH);

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}
