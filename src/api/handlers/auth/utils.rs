//! Small helpers for auth validation and one-time code handling.

use anyhow::{Context, Result};
use rand::{RngCore, rngs::OsRng};
use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Whole minutes for email copy, never less than one.
pub(super) fn ttl_minutes(ttl_seconds: i64) -> i64 {
    (ttl_seconds / 60).max(1)
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Mask an email for display, keeping only the first and last character of
/// the local part (`alice@example.com` -> `a***e@example.com`). Local parts
/// of one or two characters get a fixed-width mask so their length is not
/// revealed either.
pub(super) fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return String::new();
    };
    let chars: Vec<char> = local.chars().collect();
    match chars.as_slice() {
        [] => String::new(),
        [first] | [first, _] => format!("{first}*****@{domain}"),
        [first, middle @ .., last] => {
            format!("{first}{}{last}@{domain}", "*".repeat(middle.len()))
        }
    }
}

/// Generate a uniformly random 6-digit one-time code (100000..=999999).
///
/// The plaintext is only handed to the email sender; the database stores an
/// Argon2 hash.
pub(super) fn generate_otp_code() -> Result<String> {
    const SPAN: u32 = 900_000;
    // Largest multiple of SPAN representable in u32, for rejection sampling.
    const BOUND: u32 = u32::MAX - (u32::MAX % SPAN);
    loop {
        let mut bytes = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate one-time code")?;
        let draw = u32::from_be_bytes(bytes);
        if draw < BOUND {
            return Ok((100_000 + draw % SPAN).to_string());
        }
    }
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
