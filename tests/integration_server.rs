//! Integration tests for the dungi account service.
//!
//! This suite verifies the full startup and request handling of the `dungi`
//! binary by:
//! 1. Spawning the actual binary as a supervised child process against a
//!    Postgres instance supplied via `DUNGI_TEST_DSN`.
//! 2. Executing real HTTP requests against the running service.
//!
//! The test is skipped when `DUNGI_TEST_DSN` is not set. Migrations are
//! embedded in the binary and run at startup, so the database only needs to
//! exist and be reachable.

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::{
    env,
    net::TcpListener,
    process::{Child, Command, Stdio},
    time::Duration,
};
use tokio::time::sleep;
use uuid::Uuid;

struct ChildGuard(Child);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn pick_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("Failed to bind a local port")?;
    Ok(listener
        .local_addr()
        .context("Failed to read local port")?
        .port())
}

async fn wait_for_ready(client: &reqwest::Client, base: &str) -> Result<()> {
    for _ in 0..40 {
        match client.get(format!("{base}/health")).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            _ => sleep(Duration::from_millis(250)).await,
        }
    }
    bail!("dungi did not become ready at {base}");
}

#[tokio::test]
async fn server_starts_and_serves_auth_flows() -> Result<()> {
    let Ok(dsn) = env::var("DUNGI_TEST_DSN") else {
        eprintln!("Skipping integration test: DUNGI_TEST_DSN not set");
        return Ok(());
    };

    let port = pick_port()?;
    let base = format!("http://127.0.0.1:{port}");

    // 1. Spawn binary
    let mut command = Command::new(env!("CARGO_BIN_EXE_dungi"));
    command.env("DUNGI_LOG_LEVEL", "debug");
    // Clear conflicting env vars that might leak from the host
    command.env_remove("DUNGI_BREVO_API_KEY");
    command.env_remove("DUNGI_PORT");
    command.env_remove("DUNGI_FRONTEND_BASE_URL");

    let _child = ChildGuard(
        command
            .args([
                "--port",
                &port.to_string(),
                "--dsn",
                &dsn,
                "--session-secret",
                "integration-test-secret",
            ])
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to spawn dungi binary")?,
    );

    // 2. Verify connectivity
    let client = reqwest::Client::new();
    wait_for_ready(&client, &base).await?;

    let resp = client.get(format!("{base}/health")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-app"));

    let resp = client
        .get(format!("{base}/api-docs/openapi.json"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);

    // 3. Signup OTP issuance with a fresh email
    let email = format!("it-{}@example.com", Uuid::new_v4().simple());

    let resp = client
        .post(format!("{base}/api/auth/send-signup-otp"))
        .json(&json!({
            "name": "Integration Test",
            "email": email,
            "password": "Str0ng!Passw0rd",
            "role": "seeker"
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("OTP sent"));
    let masked = body["maskedEmail"].as_str().unwrap_or_default();
    assert!(masked.contains("***"), "masked email, got: {masked}");
    assert!(!masked.contains(&email));

    // Immediate resend trips the cooldown
    let resp = client
        .post(format!("{base}/api/auth/resend-signup-otp"))
        .json(&json!({ "email": email }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], json!("Wait before requesting another OTP"));
    let retry_after = body["retryAfterSecs"].as_u64().unwrap_or_default();
    assert!(retry_after > 0 && retry_after <= 60);

    // Weak signup password is rejected with the failed rules listed
    let resp = client
        .post(format!("{base}/api/auth/send-signup-otp"))
        .json(&json!({
            "name": "Integration Test",
            "email": format!("weak-{email}"),
            "password": "weak",
            "role": "seeker"
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], json!("Weak password"));
    assert!(body["errors"].as_array().is_some_and(|e| !e.is_empty()));

    // 4. Verification with a code that was never issued stays generic
    let resp = client
        .post(format!("{base}/api/auth/verify-email-otp"))
        .json(&json!({
            "name": "Integration Test",
            "email": format!("nocode-{email}"),
            "otp": "123456",
            "password": "Str0ng!Passw0rd",
            "role": "seeker"
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], json!("OTP expired or invalid"));

    // 5. Login and reset against an unknown account
    let resp = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({ "email": format!("ghost-{email}"), "password": "Str0ng!Passw0rd" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], json!("Invalid credentials"));

    let resp = client
        .post(format!("{base}/api/auth/forgot-password"))
        .json(&json!({ "email": format!("ghost-{email}") }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], json!("No account found"));

    // 6. Session endpoints without a token
    let resp = client.get(format!("{base}/api/auth/me")).send().await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], json!("Not authorized"));

    let resp = client.get(format!("{base}/api/auth/logout")).send().await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("token="), "logout clears cookie: {cookie}");
    assert!(cookie.contains("Max-Age=0"));
    let body: Value = resp.json().await?;
    assert_eq!(body["success"], json!(true));

    Ok(())
}
