//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let session_secret = matches
        .get_one::<String>("session-secret")
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --session-secret")?;

    let frontend_base_url = matches
        .get_one::<String>("frontend-base-url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:5173".to_string());
    let session_ttl_seconds = matches
        .get_one::<i64>("session-ttl-seconds")
        .copied()
        .unwrap_or(2_592_000);
    let otp_ttl_seconds = matches
        .get_one::<i64>("otp-ttl-seconds")
        .copied()
        .unwrap_or(300);
    let otp_resend_cooldown_seconds = matches
        .get_one::<u64>("otp-resend-cooldown-seconds")
        .copied()
        .unwrap_or(60);
    let otp_sweep_interval_seconds = matches
        .get_one::<u64>("otp-sweep-interval-seconds")
        .copied()
        .unwrap_or(60);

    let brevo_api_key = matches
        .get_one::<String>("brevo-api-key")
        .cloned()
        .map(SecretString::from);
    let email_from = matches
        .get_one::<String>("email-from")
        .cloned()
        .unwrap_or_else(|| "noreply@jobportal.com".to_string());
    let email_from_name = matches
        .get_one::<String>("email-from-name")
        .cloned()
        .unwrap_or_else(|| "Job Portal".to_string());

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url,
        session_secret,
        session_ttl_seconds,
        otp_ttl_seconds,
        otp_resend_cooldown_seconds,
        otp_sweep_interval_seconds,
        brevo_api_key,
        email_from,
        email_from_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(
            [
                ("DUNGI_PORT", Some("9000")),
                ("DUNGI_DSN", Some("postgres://user@localhost:5432/dungi")),
                ("DUNGI_SESSION_SECRET", Some("sekret")),
                ("DUNGI_FRONTEND_BASE_URL", Some("https://jobs.example.com")),
                ("DUNGI_OTP_TTL_SECONDS", Some("120")),
                ("DUNGI_OTP_RESEND_COOLDOWN_SECONDS", Some("30")),
                ("DUNGI_BREVO_API_KEY", None),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["dungi"]);
                let action = handler(&matches).unwrap();

                let Action::Server(args) = action;
                assert_eq!(args.port, 9000);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/dungi");
                assert_eq!(args.session_secret.expose_secret(), "sekret");
                assert_eq!(args.frontend_base_url, "https://jobs.example.com");
                assert_eq!(args.session_ttl_seconds, 2_592_000);
                assert_eq!(args.otp_ttl_seconds, 120);
                assert_eq!(args.otp_resend_cooldown_seconds, 30);
                assert_eq!(args.otp_sweep_interval_seconds, 60);
                assert!(args.brevo_api_key.is_none());
                assert_eq!(args.email_from, "noreply@jobportal.com");
                assert_eq!(args.email_from_name, "Job Portal");
            },
        );
    }

    #[test]
    fn brevo_api_key_is_kept_secret() {
        temp_env::with_vars(
            [
                ("DUNGI_DSN", Some("postgres://localhost/dungi")),
                ("DUNGI_SESSION_SECRET", Some("sekret")),
                ("DUNGI_BREVO_API_KEY", Some("xkeysib-test")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["dungi"]);
                let action = handler(&matches).unwrap();

                let Action::Server(args) = action;
                let api_key = args.brevo_api_key.expect("api key should be parsed");
                assert_eq!(api_key.expose_secret(), "xkeysib-test");
                assert!(!format!("{api_key:?}").contains("xkeysib-test"));
            },
        );
    }
}
