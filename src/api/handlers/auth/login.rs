//! Login endpoint issuing cookie-backed sessions.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::password::{is_weak_password, verify_secret};
use super::session::{issue_session_token, session_cookie};
use super::state::AuthState;
use super::storage::lookup_account_by_email;
use super::types::{AccountEnvelope, ApiMessage, LoginRequest, LoginResponse};
use super::utils::normalize_email;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookie set", body = LoginResponse),
        (status = 400, description = "Missing credentials", body = ApiMessage),
        (status = 401, description = "Unknown email or wrong password", body = ApiMessage),
        (status = 403, description = "Email not verified yet", body = ApiMessage),
        (status = 500, description = "Storage failure", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiMessage::failure("Missing payload")),
            )
                .into_response();
        }
    };

    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        warn!(
            email = %email,
            outcome = "failed",
            reason = "missing credentials",
            "login attempt"
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("Email & password required")),
        )
            .into_response();
    }
    let email = normalize_email(&email);

    let account = match lookup_account_by_email(&pool, &email).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            // Same message as a wrong password; unknown emails stay unknowable.
            warn!(
                email = %email,
                outcome = "failed",
                reason = "user not found",
                "login attempt"
            );
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiMessage::failure("Invalid credentials")),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to look up account: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Login failed")),
            )
                .into_response();
        }
    };

    // Checked before the password so a wrong password on an unverified
    // account still reports the verification gap.
    if !account.email_verified {
        warn!(
            email = %email,
            outcome = "failed",
            reason = "email not verified",
            "login attempt"
        );
        return (
            StatusCode::FORBIDDEN,
            Json(ApiMessage::failure("Verify email before login")),
        )
            .into_response();
    }

    match verify_secret(&password, &account.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                email = %email,
                outcome = "failed",
                reason = "wrong password",
                "login attempt"
            );
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiMessage::failure("Invalid credentials")),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to verify password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Login failed")),
            )
                .into_response();
        }
    }

    let token = match issue_session_token(auth_state.config(), account.id) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to issue session token: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Login failed")),
            )
                .into_response();
        }
    };
    let cookie = match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Login failed")),
            )
                .into_response();
        }
    };

    info!(email = %email, outcome = "success", "login attempt");

    // Advisory only; a known-weak password still logs in.
    let weak_password = is_weak_password(&password);
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    (
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            success: true,
            user: AccountEnvelope::from(account),
            weak_password,
        }),
    )
        .into_response()
}
