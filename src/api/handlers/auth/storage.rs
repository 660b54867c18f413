//! Database helpers for accounts and verification codes.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::ledger::CodePurpose;
use super::utils::is_unique_violation;

/// Outcome when inserting the account row at signup verification time.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created,
    Conflict,
}

/// Account fields needed by login, reset, and profile responses.
pub(super) struct AccountRecord {
    pub(super) id: Uuid,
    pub(super) name: String,
    pub(super) email: String,
    pub(super) password_hash: String,
    pub(super) role: String,
    pub(super) email_verified: bool,
    pub(super) profile: Value,
}

/// Fields for the account row created once a signup code is consumed.
pub(super) struct NewAccount {
    pub(super) email: String,
    pub(super) name: String,
    pub(super) password_hash: String,
    pub(super) role: String,
    pub(super) profile: Value,
}

/// One verification-code row. Expiry is evaluated by the database so clock
/// skew between service and store cannot revive a dead code.
pub(super) struct CodeRecord {
    pub(super) id: Uuid,
    pub(super) code_hash: String,
    pub(super) verified: bool,
    pub(super) expired: bool,
}

pub(super) async fn account_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let query = "SELECT 1 FROM accounts WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check account existence")?;
    Ok(row.is_some())
}

pub(super) async fn lookup_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AccountRecord>> {
    let query = r"
        SELECT id, name, email, password_hash, role, email_verified, profile::text AS profile
        FROM accounts
        WHERE email = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by email")?;

    row.map(account_from_row).transpose()
}

pub(super) async fn lookup_account_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<AccountRecord>> {
    let query = r"
        SELECT id, name, email, password_hash, role, email_verified, profile::text AS profile
        FROM accounts
        WHERE id = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;

    row.map(account_from_row).transpose()
}

fn account_from_row(row: sqlx::postgres::PgRow) -> Result<AccountRecord> {
    let profile_text: String = row.get("profile");
    let profile =
        serde_json::from_str(&profile_text).context("failed to parse stored profile json")?;
    Ok(AccountRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        email_verified: row.get("email_verified"),
        profile,
    })
}

/// Replace any live code for (email, purpose) with a new one.
///
/// Delete and insert run in one transaction so two concurrent issuances can
/// never leave more than one authoritative row behind.
pub(super) async fn replace_verification_code(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    code_hash: &str,
    ttl_seconds: i64,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin code replacement")?;

    let query = "DELETE FROM verification_codes WHERE email = $1 AND purpose = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete prior verification codes")?;

    let query = r"
        INSERT INTO verification_codes (email, purpose, code_hash, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(purpose.as_str())
        .bind(code_hash)
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert verification code")?;

    tx.commit().await.context("commit code replacement")?;
    Ok(())
}

/// Most recently created code for (email, purpose), expired or not.
pub(super) async fn latest_verification_code(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
) -> Result<Option<CodeRecord>> {
    let query = r"
        SELECT id, code_hash, verified, (expires_at <= NOW()) AS expired
        FROM verification_codes
        WHERE email = $1
          AND purpose = $2
        ORDER BY created_at DESC
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(purpose.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup verification code")?;

    Ok(row.map(|row| CodeRecord {
        id: row.get("id"),
        code_hash: row.get("code_hash"),
        verified: row.get("verified"),
        expired: row.get("expired"),
    }))
}

pub(super) async fn mark_code_verified(pool: &PgPool, code_id: Uuid) -> Result<()> {
    let query = "UPDATE verification_codes SET verified = TRUE WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(code_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to mark verification code verified")?;
    Ok(())
}

pub(super) async fn delete_verification_code(pool: &PgPool, code_id: Uuid) -> Result<()> {
    let query = "DELETE FROM verification_codes WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(code_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete verification code")?;
    Ok(())
}

/// Create the verified account and consume its signup code atomically.
pub(super) async fn create_account_consuming_code(
    pool: &PgPool,
    account: &NewAccount,
    code_id: Uuid,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let profile_text =
        serde_json::to_string(&account.profile).context("failed to serialize profile json")?;
    let query = r"
        INSERT INTO accounts
            (email, name, password_hash, role, email_verified, profile)
        VALUES ($1, $2, $3, $4, TRUE, $5::jsonb)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(&account.role)
        .bind(profile_text)
        .execute(&mut *tx)
        .instrument(span)
        .await;

    if let Err(err) = result {
        if is_unique_violation(&err) {
            let _ = tx.rollback().await;
            return Ok(SignupOutcome::Conflict);
        }
        return Err(err).context("failed to insert account");
    }

    let query = "DELETE FROM verification_codes WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(code_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume signup code")?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created)
}

/// Write the new password hash and consume the reset code atomically.
pub(super) async fn update_password_consuming_code(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    code_id: Uuid,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin password reset transaction")?;

    let query = "UPDATE accounts SET password_hash = $2 WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update account password")?;

    let query = "DELETE FROM verification_codes WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(code_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume reset code")?;

    tx.commit()
        .await
        .context("commit password reset transaction")?;
    Ok(())
}

/// Drop every expired code. The sweeper calls this on an interval; the
/// per-request path also deletes expired rows it trips over.
pub(crate) async fn delete_expired_codes(pool: &PgPool) -> Result<u64> {
    let query = "DELETE FROM verification_codes WHERE expires_at <= NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete expired verification codes")?;
    Ok(result.rows_affected())
}
