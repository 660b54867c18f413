//! Password reset endpoints: request a code, verify it, set a new password.
//!
//! The reset code lives across two phases. `verify-reset-otp` marks the row
//! verified without touching the password; `reset-password` re-verifies the
//! same row, requires the verified flag, then swaps the hash and deletes the
//! row in one transaction.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::email;

use super::ledger::{CodePurpose, VerifyOutcome, issue_code, verify_code};
use super::password::{hash_secret, validate_password};
use super::rate_limit::RateLimitDecision;
use super::state::AuthState;
use super::storage::{account_exists, mark_code_verified, update_password_consuming_code};
use super::types::{
    ApiMessage, ForgotPasswordRequest, OtpSentResponse, RateLimitedResponse,
    ResetPasswordRequest, VerifyResetOtpRequest, WeakPasswordResponse,
};
use super::utils::{mask_email, normalize_email, ttl_minutes};

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code issued and emailed", body = OtpSentResponse),
        (status = 400, description = "Missing email", body = ApiMessage),
        (status = 404, description = "No account for that email", body = ApiMessage),
        (status = 429, description = "Resend cooldown active", body = RateLimitedResponse),
        (status = 500, description = "Storage or email delivery failure", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
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
    if email.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("All fields required")),
        )
            .into_response();
    }
    let email = normalize_email(&email);

    // Unlike login, this endpoint reports whether the account exists.
    match account_exists(&pool, &email).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiMessage::failure("No account found")),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to check for existing account: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("OTP request failed")),
            )
                .into_response();
        }
    }

    if let RateLimitDecision::Limited { retry_after_secs } =
        auth_state.rate_limiter().check(&email)
    {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitedResponse::new(retry_after_secs)),
        )
            .into_response();
    }

    let ttl_seconds = auth_state.config().otp_ttl_seconds();
    let code = match issue_code(&pool, &email, CodePurpose::Reset, ttl_seconds).await {
        Ok(code) => code,
        Err(err) => {
            error!("Failed to issue reset code: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("OTP request failed")),
            )
                .into_response();
        }
    };

    let message = email::reset_code_message(&email, &code, ttl_minutes(ttl_seconds));
    if let Err(err) = auth_state.email_sender().send(&message).await {
        error!("Failed to deliver reset code email: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiMessage::failure("OTP email failed")),
        )
            .into_response();
    }

    auth_state.rate_limiter().record(&email);

    (
        StatusCode::OK,
        Json(OtpSentResponse::new(mask_email(&email))),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-reset-otp",
    request_body = VerifyResetOtpRequest,
    responses(
        (status = 200, description = "Code verified; password unchanged", body = ApiMessage),
        (status = 400, description = "Invalid or expired code", body = ApiMessage),
        (status = 500, description = "Storage failure", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn verify_reset_otp(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyResetOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyResetOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiMessage::failure("Missing payload")),
            )
                .into_response();
        }
    };

    let email = normalize_email(&request.email.unwrap_or_default());
    let otp = request.otp.unwrap_or_default();
    if email.is_empty() || otp.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("OTP expired or invalid")),
        )
            .into_response();
    }

    let outcome = match verify_code(&pool, &email, CodePurpose::Reset, &otp).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Failed to verify reset code: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Verification failed")),
            )
                .into_response();
        }
    };
    let VerifyOutcome::Valid { code_id, .. } = outcome else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("OTP expired or invalid")),
        )
            .into_response();
    };

    if let Err(err) = mark_code_verified(&pool, code_id).await {
        error!("Failed to mark reset code verified: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiMessage::failure("Verification failed")),
        )
            .into_response();
    }

    (StatusCode::OK, Json(ApiMessage::ok("OTP verified"))).into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced; code consumed", body = ApiMessage),
        (status = 400, description = "Weak password or invalid/unverified code", body = ApiMessage),
        (status = 500, description = "Storage failure", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
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
    let otp = request.otp.unwrap_or_default();
    let new_password = request.new_password.unwrap_or_default();
    if email.is_empty() || otp.is_empty() || new_password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("All fields required")),
        )
            .into_response();
    }
    let email = normalize_email(&email);

    let check = validate_password(&new_password);
    if !check.is_valid() {
        return (
            StatusCode::BAD_REQUEST,
            Json(WeakPasswordResponse::new(&check.errors)),
        )
            .into_response();
    }

    let outcome = match verify_code(&pool, &email, CodePurpose::Reset, &otp).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Failed to verify reset code: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Password reset failed")),
            )
                .into_response();
        }
    };
    // A row that never went through verify-reset-otp is rejected with the
    // same message as a bad code.
    let VerifyOutcome::Valid {
        code_id,
        verified: true,
    } = outcome
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("OTP expired or invalid")),
        )
            .into_response();
    };

    let password_hash = match hash_secret(&new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash new password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Password reset failed")),
            )
                .into_response();
        }
    };

    if let Err(err) = update_password_consuming_code(&pool, &email, &password_hash, code_id).await
    {
        error!("Failed to update account password: {err}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiMessage::failure("Password reset failed")),
        )
            .into_response();
    }

    auth_state.rate_limiter().clear(&email);

    (
        StatusCode::OK,
        Json(ApiMessage::ok("Password reset successful")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::super::state::{AuthConfig, AuthState};
    use super::{forgot_password, reset_password, verify_reset_otp};
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new(
            "http://localhost:5173".to_string(),
            SecretString::from("test-session-secret"),
        );
        Arc::new(AuthState::new(
            config,
            Arc::new(NoopRateLimiter),
            Arc::new(crate::api::email::LogEmailSender),
        ))
    }

    #[tokio::test]
    async fn forgot_password_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = forgot_password(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_reset_otp_blank_fields_are_generic_rejection() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = super::VerifyResetOtpRequest {
            email: Some("alice@example.com".to_string()),
            otp: None,
        };
        let response = verify_reset_otp(Extension(pool), Some(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["message"], "OTP expired or invalid");
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_rejects_weak_replacement() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = super::ResetPasswordRequest {
            email: Some("alice@example.com".to_string()),
            otp: Some("123456".to_string()),
            new_password: Some("password123".to_string()),
        };
        let response = reset_password(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["message"], "Weak password");
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_requires_all_fields() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = super::ResetPasswordRequest {
            email: Some("alice@example.com".to_string()),
            otp: Some("123456".to_string()),
            new_password: None,
        };
        let response = reset_password(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(body["message"], "All fields required");
        Ok(())
    }
}
