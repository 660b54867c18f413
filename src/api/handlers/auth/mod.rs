//! Account lifecycle handlers and supporting modules.
//!
//! This module coordinates OTP-gated signup, login sessions, and the
//! password-reset workflow.
//!
//! ## One-Time Codes
//!
//! Six-digit codes are issued per `(email, purpose)`, hashed at rest, and
//! expire five minutes after issuance (database clock). Issuing a new code
//! atomically replaces any previous one for the same purpose, so at most one
//! row is ever authoritative.
//!
//! ## Accounts
//!
//! An account row is only created once a signup code has been presented back;
//! creation and code consumption share one transaction. Emails are normalized
//! to lowercase everywhere and unique.
//!
//! ## Sessions
//!
//! Sessions are stateless 30-day HS256 tokens carried in an `HttpOnly`,
//! `SameSite=None` cookie named `token`. Logout merely clears the cookie.

mod ledger;
pub(crate) mod login;
mod password;
mod rate_limit;
pub(crate) mod reset;
pub(crate) mod session;
pub(crate) mod signup;
mod state;
mod storage;
pub(crate) mod types;
mod utils;

pub use rate_limit::{CooldownRateLimiter, NoopRateLimiter, RateLimiter};
pub use state::{AuthConfig, AuthState};
pub(crate) use storage::delete_expired_codes;
