//! Password strength policy and Argon2id hashing.
//!
//! The policy mirrors what the frontend enforces: a minimum length, one
//! character from each class, and a deny list of passwords that show up in
//! every breach corpus. Hashing covers both account passwords and one-time
//! codes; only PHC strings ever reach the database.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Characters accepted by the special-character rule.
const SPECIAL_CHARS: &str = "!@#$%^&*()_+-={}[]/?.,";

/// Passwords rejected outright, compared case-insensitively.
const WEAK_PASSWORDS: &[&str] = &[
    "password",
    "password123",
    "password1",
    "123456",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty",
    "qwerty123",
    "qwertyuiop",
    "admin",
    "admin123",
    "administrator",
    "abc123",
    "abc123456",
    "welcome",
    "welcome123",
    "letmein",
    "monkey",
    "dragon",
    "master",
    "sunshine",
    "princess",
    "login",
    "passw0rd",
    "password!",
    "admin@123",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Strength {
    Weak,
    Medium,
    Strong,
}

impl Strength {
    pub(super) const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

/// Outcome of the strength policy: which rules failed, plus a coarse score.
#[derive(Debug)]
pub(super) struct PasswordCheck {
    pub errors: Vec<&'static str>,
    pub strength: Strength,
}

impl PasswordCheck {
    pub(super) fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a candidate password, reporting every rule it fails.
pub(super) fn validate_password(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        errors.push("Password must contain at least one special character (!@#$%^&*()_+-={}[]/?.,)");
    }
    if is_weak_password(password) {
        errors.push("This password is too common and not allowed");
    }

    PasswordCheck {
        errors,
        strength: password_strength(password),
    }
}

/// Coarse strength score used for advisories, never for blocking.
pub(super) fn password_strength(password: &str) -> Strength {
    if password.is_empty() || is_weak_password(password) {
        return Strength::Weak;
    }

    let length = password.chars().count();
    let mut score = 0u8;
    if length >= 8 {
        score += 1;
    }
    if length >= 12 {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        score += 1;
    }

    match score {
        0..=3 => Strength::Weak,
        4 | 5 => Strength::Medium,
        _ => Strength::Strong,
    }
}

/// Whether the plaintext appears in the deny list. Also surfaced at login as
/// a non-blocking advisory for accounts created before the list existed.
pub(super) fn is_weak_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    WEAK_PASSWORDS.contains(&lowered.as_str())
}

/// Argon2id-hash a secret (account password or one-time code) with a fresh
/// random salt, returning the PHC string for storage.
pub(super) fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash secret: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a secret against a stored PHC string. The comparison inside the
/// hashing library is constant time.
pub(super) fn verify_secret(secret: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| anyhow!("stored hash is not a valid PHC string: {err}"))?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(anyhow!("secret verification failed: {err}")),
    }
}
