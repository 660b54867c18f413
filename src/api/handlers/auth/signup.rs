//! Signup endpoints: code issuance, resend, and account creation.
//!
//! An account only comes into existence at verification time, created in the
//! same transaction that consumes the signup code. Until then the email owns
//! nothing but a hashed, expiring code row.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::api::email;

use super::ledger::{CodePurpose, VerifyOutcome, issue_code, verify_code};
use super::password::{hash_secret, validate_password};
use super::rate_limit::RateLimitDecision;
use super::state::AuthState;
use super::storage::{NewAccount, SignupOutcome, account_exists, create_account_consuming_code};
use super::types::{
    ApiMessage, OtpSentResponse, RateLimitedResponse, ResendSignupOtpRequest,
    SendSignupOtpRequest, VerifyEmailOtpRequest, WeakPasswordResponse,
};
use super::utils::{mask_email, normalize_email, ttl_minutes, valid_email};

const VALID_ROLES: [&str; 2] = ["seeker", "recruiter"];

#[utoipa::path(
    post,
    path = "/api/auth/send-signup-otp",
    request_body = SendSignupOtpRequest,
    responses(
        (status = 200, description = "Code issued and emailed", body = OtpSentResponse),
        (status = 400, description = "Missing fields, weak password, or duplicate account", body = ApiMessage),
        (status = 429, description = "Resend cooldown active", body = RateLimitedResponse),
        (status = 500, description = "Storage or email delivery failure", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn send_signup_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendSignupOtpRequest>>,
) -> impl IntoResponse {
    let request: SendSignupOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiMessage::failure("Missing payload")),
            )
                .into_response();
        }
    };

    let name = request.name.unwrap_or_default();
    let email = request.email.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    let role = request.role.unwrap_or_default();
    if name.is_empty() || email.is_empty() || password.is_empty() || role.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("All fields required")),
        )
            .into_response();
    }
    let email = normalize_email(&email);

    let check = validate_password(&password);
    if !check.is_valid() {
        return (
            StatusCode::BAD_REQUEST,
            Json(WeakPasswordResponse::new(&check.errors)),
        )
            .into_response();
    }

    match account_exists(&pool, &email).await {
        Ok(false) => {}
        Ok(true) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiMessage::failure("User already exists")),
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
    let code = match issue_code(&pool, &email, CodePurpose::Signup, ttl_seconds).await {
        Ok(code) => code,
        Err(err) => {
            error!("Failed to issue signup code: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("OTP request failed")),
            )
                .into_response();
        }
    };

    let message = email::signup_code_message(&email, &code, ttl_minutes(ttl_seconds));
    if let Err(err) = auth_state.email_sender().send(&message).await {
        // The stored code stays behind and ages out; nothing counts as sent.
        error!("Failed to deliver signup code email: {err}");
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
    path = "/api/auth/verify-email-otp",
    request_body = VerifyEmailOtpRequest,
    responses(
        (status = 201, description = "Account created", body = ApiMessage),
        (status = 400, description = "Invalid or expired code, bad fields, or duplicate account", body = ApiMessage),
        (status = 500, description = "Storage failure", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn verify_email_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyEmailOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyEmailOtpRequest = match payload {
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
    // NotFound, Expired, and Mismatch all collapse into the same rejection so
    // the response does not reveal which one happened.
    if email.is_empty() || otp.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("OTP expired or invalid")),
        )
            .into_response();
    }

    let outcome = match verify_code(&pool, &email, CodePurpose::Signup, &otp).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("Failed to verify signup code: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Account creation failed")),
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

    // The code checked out; the account fields get validated only now, and a
    // rejection here leaves the code intact for another attempt.
    let name = request.name.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    let role = request.role.unwrap_or_default();
    if name.is_empty() || password.is_empty() || role.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("All fields required")),
        )
            .into_response();
    }

    let check = validate_password(&password);
    if !check.is_valid() {
        return (
            StatusCode::BAD_REQUEST,
            Json(WeakPasswordResponse::new(&check.errors)),
        )
            .into_response();
    }

    if !VALID_ROLES.contains(&role.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("Please select a valid role")),
        )
            .into_response();
    }

    if !valid_email(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("Please add a valid email")),
        )
            .into_response();
    }

    let password_hash = match hash_secret(&password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash account password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Account creation failed")),
            )
                .into_response();
        }
    };

    let account = NewAccount {
        email: email.clone(),
        name,
        password_hash,
        role,
        profile: request
            .profile
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
    };

    match create_account_consuming_code(&pool, &account, code_id).await {
        Ok(SignupOutcome::Created) => {
            auth_state.rate_limiter().clear(&email);
            (
                StatusCode::CREATED,
                Json(ApiMessage::ok("Account created successfully")),
            )
                .into_response()
        }
        Ok(SignupOutcome::Conflict) => (
            StatusCode::BAD_REQUEST,
            Json(ApiMessage::failure("User already exists")),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to create account: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("Account creation failed")),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-signup-otp",
    request_body = ResendSignupOtpRequest,
    responses(
        (status = 200, description = "Fresh code issued and emailed", body = OtpSentResponse),
        (status = 400, description = "Missing email or account already exists", body = ApiMessage),
        (status = 429, description = "Resend cooldown active", body = RateLimitedResponse),
        (status = 500, description = "Storage or email delivery failure", body = ApiMessage)
    ),
    tag = "auth"
)]
pub async fn resend_signup_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendSignupOtpRequest>>,
) -> impl IntoResponse {
    let request: ResendSignupOtpRequest = match payload {
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

    // A verified signup means there is nothing left to resend for.
    match account_exists(&pool, &email).await {
        Ok(false) => {}
        Ok(true) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiMessage::failure("User already exists")),
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
    let code = match issue_code(&pool, &email, CodePurpose::Signup, ttl_seconds).await {
        Ok(code) => code,
        Err(err) => {
            error!("Failed to issue signup code: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiMessage::failure("OTP request failed")),
            )
                .into_response();
        }
    };

    let message = email::signup_code_message(&email, &code, ttl_minutes(ttl_seconds));
    if let Err(err) = auth_state.email_sender().send(&message).await {
        error!("Failed to deliver signup code email: {err}");
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

#[cfg(test)]
mod tests {
    use super::super::rate_limit::NoopRateLimiter;
    use super::super::state::{AuthConfig, AuthState};
    use super::{send_signup_otp, verify_email_otp};
    use crate::api::email::LogEmailSender;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use serde_json::Value;
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
            Arc::new(LogEmailSender),
        ))
    }

    async fn body_json(response: axum::response::Response) -> Result<Value> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn send_signup_otp_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = send_signup_otp(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["message"], "Missing payload");
        Ok(())
    }

    #[tokio::test]
    async fn send_signup_otp_empty_fields() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = super::SendSignupOtpRequest {
            name: Some("Alice".to_string()),
            email: Some(String::new()),
            password: Some("StrongPass1!".to_string()),
            role: Some("seeker".to_string()),
            profile: None,
        };
        let response = send_signup_otp(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["message"], "All fields required");
        Ok(())
    }

    #[tokio::test]
    async fn send_signup_otp_weak_password_reports_rules() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = super::SendSignupOtpRequest {
            name: Some("Alice".to_string()),
            email: Some("alice@example.com".to_string()),
            password: Some("Weak1!".to_string()),
            role: Some("seeker".to_string()),
            profile: None,
        };
        let response = send_signup_otp(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["message"], "Weak password");
        assert_eq!(
            body["errors"][0],
            "Password must be at least 8 characters long"
        );
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_otp_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = verify_email_otp(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_otp_blank_code_is_generic_rejection() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = super::VerifyEmailOtpRequest {
            email: Some("alice@example.com".to_string()),
            otp: Some(String::new()),
            name: Some("Alice".to_string()),
            password: Some("StrongPass1!".to_string()),
            role: Some("seeker".to_string()),
            profile: None,
        };
        let response = verify_email_otp(
            Extension(pool),
            Extension(auth_state()),
            Some(Json(request)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["message"], "OTP expired or invalid");
        Ok(())
    }
}
