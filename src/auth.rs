use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    config::{AppConfig, Env},
    models::Identity,
    repository::RepositoryState,
};

/// Claims
///
/// Payload of a session JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the Supabase auth id, matched against `"User"."supabaseId"`.
    pub sub: String,
    /// Audience (aud): "authenticated" for signed-in Supabase users.
    pub aud: String,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// Session
///
/// What the session resolver attaches to every request: the identity (if
/// any) plus a replacement cookie when the token was refreshed.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub identity: Option<Identity>,
    pub refreshed_cookie: Option<HeaderValue>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Reads `name` from the `Cookie` header(s).
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// issue_token
///
/// Signs a fresh session token for the auth id `subject`, valid for `ttl_secs`.
pub fn issue_token(
    subject: &str,
    audience: &str,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = now_secs();
    let claims = Claims {
        sub: subject.to_string(),
        aud: audience.to_string(),
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// session_cookie
///
/// `Set-Cookie` value carrying `token`.
pub fn session_cookie(config: &AppConfig, token: &str) -> Option<HeaderValue> {
    let secure = if config.env == Env::Production { "; Secure" } else { "" };
    let cookie = format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
        config.session_cookie, config.session_ttl_secs
    );
    HeaderValue::from_str(&cookie).ok()
}

/// resolve_session
///
/// Session resolver. Runs for every request, public paths included, and never
/// fails: missing, invalid or expired tokens, unknown users and identity-store
/// errors all yield an anonymous session.
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header carrying the auth id
///    of an existing user.
/// 2. Token extraction: session cookie first, then `Authorization: Bearer`.
/// 3. JWT validation (signature, expiry, audience).
/// 4. Identity-store lookup by auth id for the platform user and current role.
/// 5. Transparent refresh when the token is close to expiry.
pub async fn resolve_session(headers: &HeaderMap, repo: &RepositoryState, config: &AppConfig) -> Session {
    if config.env == Env::Local {
        let bypass = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .filter(|raw| !raw.is_empty());
        if let Some(auth_id) = bypass {
            if let Ok(Some(user)) = repo.get_user_by_auth_id(auth_id).await {
                return Session {
                    identity: Some(user.into()),
                    refreshed_cookie: None,
                };
            }
        }
    }

    let Some(token) = cookie_value(headers, &config.session_cookie).or_else(|| bearer_token(headers)) else {
        return Session::default();
    };

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.set_audience(&[config.jwt_audience.as_str()]);
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "Session token rejected");
            return Session::default();
        }
    };

    let user = match repo.get_user_by_auth_id(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(auth_id = %claims.sub, "Valid token for a user missing from the identity store");
            return Session::default();
        }
        Err(e) => {
            tracing::error!(error = %e, "Identity store lookup failed, continuing unauthenticated");
            return Session::default();
        }
    };

    let remaining = (claims.exp as u64).saturating_sub(now_secs());
    let refreshed_cookie = if remaining < config.refresh_window_secs {
        match issue_token(
            &claims.sub,
            &config.jwt_audience,
            &config.jwt_secret,
            config.session_ttl_secs,
        ) {
            Ok(token) => session_cookie(config, &token),
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, keeping current token");
                None
            }
        }
    } else {
        None
    };

    Session {
        identity: Some(user.into()),
        refreshed_cookie,
    }
}

/// Identity Extractor
///
/// Handlers behind the gate take `Identity` as an argument. The gate middleware
/// stores the resolved `Session` in the request extensions; a request that
/// reaches a handler without an identity is rejected with 401.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .and_then(|session| session.identity.clone())
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
