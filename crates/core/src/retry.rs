//! Retry backoff policy for failed hook deliveries.
//!
//! Delays grow exponentially with the retry attempt and are capped:
//! `min(base * 2^(attempt - 1), max)`. Optional jitter adds up to 10% so
//! that hooks failing together do not retry in lockstep.

use std::time::Duration;

use rand::Rng;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(30);

/// Default ceiling for any single retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(3600);

/// Jitter is at most `delay / JITTER_DIVISOR`.
const JITTER_DIVISOR: u32 = 10;

/// Doubling stops after this many steps; the cap applies long before.
const MAX_EXPONENT: u32 = 20;

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    /// Deterministic policy without jitter.
    pub fn fixed(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            jitter: false,
        }
    }

    /// Delay before running `retry_attempt` (1 for the first retry).
    pub fn delay_for(&self, retry_attempt: i32) -> Duration {
        let delay = self.base_delay_for(retry_attempt);
        if self.jitter {
            add_jitter(delay)
        } else {
            delay
        }
    }

    /// The capped exponential delay, before jitter.
    pub fn base_delay_for(&self, retry_attempt: i32) -> Duration {
        let exponent = (retry_attempt.max(1) - 1).min(MAX_EXPONENT as i32) as u32;
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

fn add_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = (delay / JITTER_DIVISOR).as_millis() as u64;
    if max_jitter_ms == 0 {
        return delay;
    }
    let extra = rand::rng().random_range(0..=max_jitter_ms);
    delay + Duration::from_millis(extra)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_secs(30), Duration::from_secs(3600))
    }

    #[test]
    fn first_retry_uses_base_delay() {
        assert_eq!(policy().delay_for(1), Duration::from_secs(30));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let p = policy();
        assert_eq!(p.delay_for(2), Duration::from_secs(60));
        assert_eq!(p.delay_for(3), Duration::from_secs(120));
        assert_eq!(p.delay_for(4), Duration::from_secs(240));
    }

    #[test]
    fn delay_is_capped() {
        let p = policy();
        assert_eq!(p.delay_for(10), Duration::from_secs(3600));
        assert_eq!(p.delay_for(i32::MAX), Duration::from_secs(3600));
    }

    #[test]
    fn non_positive_attempt_treated_as_first() {
        let p = policy();
        assert_eq!(p.delay_for(0), Duration::from_secs(30));
        assert_eq!(p.delay_for(-4), Duration::from_secs(30));
    }

    #[test]
    fn delays_are_monotonic() {
        let p = policy();
        let delays: Vec<_> = (1..=12).map(|a| p.delay_for(a)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let p = RetryPolicy {
            jitter: true,
            ..policy()
        };
        for _ in 0..100 {
            let d = p.delay_for(2);
            assert!(d >= Duration::from_secs(60));
            assert!(d <= Duration::from_secs(66));
        }
    }

    #[test]
    fn default_policy_has_jitter() {
        let p = RetryPolicy::default();
        assert!(p.jitter);
        assert_eq!(p.base_delay, DEFAULT_BASE_DELAY);
        assert_eq!(p.max_delay, DEFAULT_MAX_DELAY);
    }
}
