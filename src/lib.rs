//! # Dungi (Job Portal Accounts)
//!
//! `dungi` is the account authority for the job portal. It handles OTP-gated
//! signup, login, password reset, and session token issuance.
//!
//! ## Account Model
//!
//! Accounts are created only when their email address has been verified: the
//! signup flow issues a short-lived one-time code, and the account row is
//! inserted in the same step that consumes the code. No unverified account
//! rows exist.
//!
//! - **Email Normalization:** Addresses are trimmed and lowercased before
//!   every read and write; the `accounts.email` unique index is authoritative.
//! - **Roles:** Each account is a `seeker` or a `recruiter`; the free-form
//!   profile sub-document is opaque to this service.
//!
//! ## One-Time Codes
//!
//! Codes are 6 random digits, stored only as Argon2id hashes with a 5-minute
//! absolute expiry. At most one code per (email, purpose) is authoritative;
//! issuing a new code replaces any prior one in a single transaction. Expired
//! rows are garbage collected by a background sweeper.
//!
//! ## Sessions
//!
//! Login issues a signed 30-day token carried in an HTTP-only, `Secure`,
//! `SameSite=None` cookie. Sessions are stateless; logout clears the cookie.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
