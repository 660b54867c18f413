//! Rate limiting primitives for one-time code issuance.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Cooldown guard in front of one-time code issuance.
///
/// Handlers only see this trait; the backing store is an implementation
/// detail so a shared external counter can replace the in-process map when
/// running more than one instance.
pub trait RateLimiter: Send + Sync {
    /// Whether issuance for this email may proceed right now.
    fn check(&self, email: &str) -> RateLimitDecision;
    /// Record a successful issuance for this email.
    fn record(&self, email: &str);
    /// Forget the email once its flow completes (verified signup, finished
    /// reset), ending the cooldown early.
    fn clear(&self, email: &str);
}

/// In-memory cooldown map keyed by normalized email.
///
/// State is process-local and lost on restart, which resets all cooldowns.
/// That is acceptable for an anti-spam control that is not a security
/// boundary.
pub struct CooldownRateLimiter {
    cooldown: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl CooldownRateLimiter {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn prune(entries: &mut HashMap<String, Instant>, cooldown: Duration, now: Instant) {
        entries.retain(|_, last| now.duration_since(*last) < cooldown);
    }
}

impl RateLimiter for CooldownRateLimiter {
    fn check(&self, email: &str) -> RateLimitDecision {
        let now = Instant::now();
        let Ok(mut entries) = self.entries.lock() else {
            // A poisoned map only disables the cooldown; fail open.
            return RateLimitDecision::Allowed;
        };
        Self::prune(&mut entries, self.cooldown, now);
        match entries.get(email) {
            Some(last) => {
                let remaining = self.cooldown.saturating_sub(now.duration_since(*last));
                // Round up so the caller never retries a second too early.
                let retry_after_secs =
                    remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                RateLimitDecision::Limited { retry_after_secs }
            }
            None => RateLimitDecision::Allowed,
        }
    }

    fn record(&self, email: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(email.to_string(), Instant::now());
        }
    }

    fn clear(&self, email: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(email);
        }
    }
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _email: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn record(&self, _email: &str) {}

    fn clear(&self, _email: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check("user@example.com"),
            RateLimitDecision::Allowed
        );
        limiter.record("user@example.com");
        assert_eq!(
            limiter.check("user@example.com"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn cooldown_limits_until_elapsed() {
        let limiter = CooldownRateLimiter::new(Duration::from_millis(50));
        assert_eq!(
            limiter.check("user@example.com"),
            RateLimitDecision::Allowed
        );

        limiter.record("user@example.com");
        assert!(matches!(
            limiter.check("user@example.com"),
            RateLimitDecision::Limited { .. }
        ));

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(
            limiter.check("user@example.com"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn cooldown_reports_remaining_wait_rounded_up() {
        let limiter = CooldownRateLimiter::new(Duration::from_secs(60));
        limiter.record("user@example.com");
        let RateLimitDecision::Limited { retry_after_secs } = limiter.check("user@example.com")
        else {
            panic!("expected a limited decision");
        };
        assert!(retry_after_secs >= 59);
        assert!(retry_after_secs <= 60);
    }

    #[test]
    fn clear_ends_cooldown_early() {
        let limiter = CooldownRateLimiter::new(Duration::from_secs(60));
        limiter.record("user@example.com");
        limiter.clear("user@example.com");
        assert_eq!(
            limiter.check("user@example.com"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn entries_are_independent_per_email() {
        let limiter = CooldownRateLimiter::new(Duration::from_secs(60));
        limiter.record("first@example.com");
        assert!(matches!(
            limiter.check("first@example.com"),
            RateLimitDecision::Limited { .. }
        ));
        assert_eq!(
            limiter.check("second@example.com"),
            RateLimitDecision::Allowed
        );
    }
}
