//! One-time code ledger: issue and verify short-lived numeric codes.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use super::password::{hash_secret, verify_secret};
use super::storage;
use super::utils::generate_otp_code;

/// Workflow a code is scoped to. Codes never cross purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CodePurpose {
    Signup,
    Reset,
}

impl CodePurpose {
    pub(super) const fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Reset => "reset",
        }
    }
}

/// Result of checking a submitted code against the ledger.
#[derive(Debug)]
pub(super) enum VerifyOutcome {
    /// Hash matched an unexpired row. The caller decides how to consume it:
    /// signup deletes the row while creating the account, reset flags it
    /// `verified` first and deletes it once the password actually changes.
    Valid { code_id: Uuid, verified: bool },
    Expired,
    NotFound,
    Mismatch,
}

/// Issue a new code for (email, purpose), replacing any prior one.
///
/// The returned plaintext exists only to be handed to the email sender; the
/// ledger keeps an Argon2 hash with an absolute expiry.
pub(super) async fn issue_code(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    ttl_seconds: i64,
) -> Result<String> {
    let code = generate_otp_code()?;
    let code_hash = hash_secret(&code)?;
    storage::replace_verification_code(pool, email, purpose, &code_hash, ttl_seconds).await?;
    Ok(code)
}

/// Check a submitted code against the most recent ledger row.
///
/// An expired row is deleted on sight. A mismatch leaves the row untouched so
/// the user can retry within the expiry window.
pub(super) async fn verify_code(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    submitted: &str,
) -> Result<VerifyOutcome> {
    let Some(record) = storage::latest_verification_code(pool, email, purpose).await? else {
        return Ok(VerifyOutcome::NotFound);
    };

    if record.expired {
        storage::delete_verification_code(pool, record.id).await?;
        return Ok(VerifyOutcome::Expired);
    }

    if !verify_secret(submitted, &record.code_hash)? {
        return Ok(VerifyOutcome::Mismatch);
    }

    Ok(VerifyOutcome::Valid {
        code_id: record.id,
        verified: record.verified,
    })
}

#[cfg(test)]
mod tests {
    use super::{CodePurpose, VerifyOutcome};
    use uuid::Uuid;

    #[test]
    fn code_purpose_tags() {
        assert_eq!(CodePurpose::Signup.as_str(), "signup");
        assert_eq!(CodePurpose::Reset.as_str(), "reset");
    }

    #[test]
    fn verify_outcome_debug_names() {
        let valid = VerifyOutcome::Valid {
            code_id: Uuid::nil(),
            verified: false,
        };
        assert!(format!("{valid:?}").starts_with("Valid"));
        assert_eq!(format!("{:?}", VerifyOutcome::Expired), "Expired");
        assert_eq!(format!("{:?}", VerifyOutcome::NotFound), "NotFound");
        assert_eq!(format!("{:?}", VerifyOutcome::Mismatch), "Mismatch");
    }
}
