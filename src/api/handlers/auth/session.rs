//! Session tokens, cookies, and the signed-in account endpoints.
//!
//! Sessions are stateless signed tokens, so logout is purely cookie removal
//! and there is no server-side session table. The cookie is `SameSite=None`
//! because the frontend is served from a different origin than the API.

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;
use uuid::Uuid;

use super::{
    state::{AuthConfig, AuthState},
    storage::{AccountRecord, lookup_account_by_id},
    types::{AccountEnvelope, ApiMessage, LogoutResponse, MeResponse},
};

const SESSION_COOKIE_NAME: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: u64,
    exp: u64,
}

/// Sign a session token for the account. Expiry rides inside the token.
pub(super) fn issue_session_token(config: &AuthConfig, account_id: Uuid) -> Result<String> {
    let now = unix_now()?;
    let ttl = u64::try_from(config.session_ttl_seconds()).unwrap_or(0);
    let claims = SessionClaims {
        sub: account_id.to_string(),
        iat: now,
        exp: now + ttl,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.session_secret().expose_secret().as_bytes()),
    )
    .context("failed to sign session token")
}

/// Expired, tampered, and malformed tokens all collapse to `None`.
fn decode_session_token(config: &AuthConfig, token: &str) -> Option<Uuid> {
    let key = DecodingKey::from_secret(config.session_secret().expose_secret().as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<SessionClaims>(token, &key, &validation).ok()?;
    Uuid::parse_str(&data.claims.sub).ok()
}

fn unix_now() -> Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?;
    Ok(now.as_secs())
}

/// Resolve the request's session token into an account, if any.
///
/// Returns `Ok(None)` when the token is missing or invalid.
pub(crate) async fn authenticate_account(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Option<AccountRecord>, StatusCode> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let Some(account_id) = decode_session_token(config, &token) else {
        return Ok(None);
    };
    match lookup_account_by_id(pool, account_id).await {
        Ok(record) => Ok(record),
        Err(err) => {
            error!("Failed to look up account: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Authenticated account", body = MeResponse),
        (status = 401, description = "Missing or invalid session", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match authenticate_account(&headers, &pool, auth_state.config()).await {
        Ok(Some(account)) => {
            let response = MeResponse {
                success: true,
                user: AccountEnvelope::from(account),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => (
            StatusCode::UNAUTHORIZED,
            Json(ApiMessage::failure("Not authorized")),
        )
            .into_response(),
        Err(status) => status.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Always clear the cookie, even without a valid session.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        response_headers,
        Json(LogoutResponse { success: true }),
    )
        .into_response()
}

/// Build the `HttpOnly` session cookie for a freshly issued token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=None; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=None; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let Some((key, val)) = pair.split_once('=') else {
            continue;
        };
        if key.trim() == SESSION_COOKIE_NAME {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
