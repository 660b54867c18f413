//! Email delivery abstractions and the one-time code templates.
//!
//! Code issuance awaits delivery before answering the request: a provider
//! failure fails the whole request with no "sent" state, and the already
//! stored code simply ages out. There is no queue and no retry; the user
//! retries by asking for a new code.
//!
//! The production sender talks to the Brevo transactional API. The default
//! sender for local dev is `LogEmailSender`, which logs recipient and subject
//! and returns `Ok(())`. Message bodies carry plaintext one-time codes, so no
//! sender and no `Debug` output ever includes the body.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use tracing::info;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Clone)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
}

impl fmt::Debug for EmailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailMessage")
            .field("to_email", &self.to_email)
            .field("subject", &self.subject)
            .field("html_body", &"***")
            .finish()
    }
}

/// Email delivery abstraction used by the auth flows.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to fail the triggering request.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs instead of sending real email. The body is
/// never logged; it contains the plaintext code.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            "email send stub"
        );
        Ok(())
    }
}

/// Transactional sender backed by the Brevo HTTP API.
pub struct BrevoEmailSender {
    client: Client,
    api_key: SecretString,
    from_email: String,
    from_name: String,
}

impl BrevoEmailSender {
    pub fn new(api_key: SecretString, from_email: String, from_name: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("failed to build email http client")?;
        Ok(Self {
            client,
            api_key,
            from_email,
            from_name,
        })
    }
}

#[derive(Serialize)]
struct BrevoEmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody<'a> {
    sender: BrevoEmailAddress<'a>,
    to: Vec<BrevoEmailAddress<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

#[async_trait]
impl EmailSender for BrevoEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            to: vec![BrevoEmailAddress {
                email: &message.to_email,
                name: None,
            }],
            subject: &message.subject,
            html_content: &message.html_body,
        };

        let response = self
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("failed to reach email provider")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("email provider returned {status}"));
        }

        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            "transactional email sent"
        );
        Ok(())
    }
}

/// Verification email carrying a signup code.
#[must_use]
pub fn signup_code_message(to_email: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Verify Your Email - Job Portal".to_string(),
        html_body: code_email_html(
            "Email Verification",
            "Thank you for registering with our Job Portal! Your verification code is:",
            code,
            ttl_minutes,
            "If you didn't request this code, please ignore this email.",
        ),
    }
}

/// Reset email carrying a password-reset code.
#[must_use]
pub fn reset_code_message(to_email: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Reset Your Password - Job Portal".to_string(),
        html_body: code_email_html(
            "Password Reset Request",
            "We received a request to reset your password. Your password reset code is:",
            code,
            ttl_minutes,
            "If you didn't request a password reset, please ignore this email and \
             your password will remain unchanged.",
        ),
    }
}

fn code_email_html(
    heading: &str,
    intro: &str,
    code: &str,
    ttl_minutes: i64,
    disclaimer: &str,
) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; background-color: #f4f4f4;">
  <div style="background-color: white; padding: 30px; border-radius: 10px;">
    <h2 style="color: #6366f1; margin-bottom: 20px;">{heading}</h2>
    <p style="color: #333; font-size: 16px; line-height: 1.6;">{intro}</p>
    <div style="background-color: #f0f0f0; padding: 20px; text-align: center; border-radius: 5px; margin: 20px 0;">
      <h1 style="color: #6366f1; font-size: 36px; letter-spacing: 8px; margin: 0;">{code}</h1>
    </div>
    <p style="color: #666; font-size: 14px; line-height: 1.6;">This code will expire in <strong>{ttl_minutes} minutes</strong>.</p>
    <p style="color: #666; font-size: 14px; line-height: 1.6;">{disclaimer}</p>
    <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
    <p style="color: #999; font-size: 12px; text-align: center;">Job Portal - Your Career Partner</p>
  </div>
</div>"#
    )
}
