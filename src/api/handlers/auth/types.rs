//! Request/response types for the account endpoints.
//!
//! Request fields are optional so that missing and empty values surface as
//! the API's own validation errors instead of deserialization rejections.
//! Field names on the wire keep the original frontend contract, camelCase
//! included.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::storage::AccountRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendSignupOtpRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub profile: Option<Value>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub profile: Option<Value>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendSignupOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyResetOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default, rename = "newPassword")]
    pub new_password: Option<String>,
}

/// Shared `{success, message}` envelope for plain statuses and errors.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ApiMessage {
    pub success: bool,
    pub message: String,
}

impl ApiMessage {
    pub(crate) fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    pub(crate) fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
        }
    }
}

/// Weak-password rejection carrying the failed policy rules.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct WeakPasswordResponse {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
}

impl WeakPasswordResponse {
    pub(super) fn new(errors: &[&str]) -> Self {
        Self {
            success: false,
            message: "Weak password".to_string(),
            errors: errors.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OtpSentResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "maskedEmail")]
    pub masked_email: String,
}

impl OtpSentResponse {
    pub(super) fn new(masked_email: String) -> Self {
        Self {
            success: true,
            message: "OTP sent".to_string(),
            masked_email,
        }
    }
}

/// Rate-limit denial with the concrete remaining wait.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RateLimitedResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "retryAfterSecs")]
    pub retry_after_secs: u64,
}

impl RateLimitedResponse {
    pub(super) fn new(retry_after_secs: u64) -> Self {
        Self {
            success: false,
            message: "Wait before requesting another OTP".to_string(),
            retry_after_secs,
        }
    }
}

/// Account as exposed to the frontend. Never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AccountEnvelope {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub profile: Value,
}

impl From<AccountRecord> for AccountEnvelope {
    fn from(record: AccountRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            email: record.email,
            role: record.role,
            profile: record.profile,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub user: AccountEnvelope,
    #[serde(rename = "weakPassword")]
    pub weak_password: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub success: bool,
    pub user: AccountEnvelope,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutResponse {
    pub success: bool,
}
