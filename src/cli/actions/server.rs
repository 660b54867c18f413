use crate::api::{
    self,
    email::{BrevoEmailSender, EmailSender, LogEmailSender},
    handlers::auth::{AuthConfig, CooldownRateLimiter},
};
use anyhow::Result;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: i64,
    pub otp_ttl_seconds: i64,
    pub otp_resend_cooldown_seconds: u64,
    pub otp_sweep_interval_seconds: u64,
    pub brevo_api_key: Option<SecretString>,
    pub email_from: String,
    pub email_from_name: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the email sender cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.frontend_base_url, args.session_secret)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds);

    let rate_limiter = Arc::new(CooldownRateLimiter::new(Duration::from_secs(
        args.otp_resend_cooldown_seconds,
    )));

    // Without an API key, one-time code emails are logged instead of sent,
    // which keeps local runs self-contained.
    let email_sender: Arc<dyn EmailSender> = match args.brevo_api_key {
        Some(api_key) => Arc::new(BrevoEmailSender::new(
            api_key,
            args.email_from,
            args.email_from_name,
        )?),
        None => Arc::new(LogEmailSender),
    };

    api::new(
        args.port,
        args.dsn,
        auth_config,
        rate_limiter,
        email_sender,
        args.otp_sweep_interval_seconds,
    )
    .await
}
