//! Dispatch and retry configuration.

use std::str::FromStr;
use std::time::Duration;

use cms_core::execution::DEFAULT_MAX_RESPONSE_BODY_BYTES;
use cms_core::retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};

/// Default slack on top of a hook's timeout before its retry claim expires.
pub const DEFAULT_CLAIM_GRACE: Duration = Duration::from_secs(60);

/// Smallest grace accepted from the environment. Covers the record writes
/// around the HTTP exchange.
pub const MIN_CLAIM_GRACE: Duration = Duration::from_secs(5);

/// Tuning for the dispatcher and the retry scheduler.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How often the retry scheduler polls for due attempts.
    pub poll_interval: Duration,
    /// Maximum retries claimed per poll.
    pub batch_size: i64,
    /// Backoff between attempts of one chain.
    pub retry_policy: RetryPolicy,
    /// Slack added to a hook's own timeout when leasing a claimed retry.
    ///
    /// A claim that is still open once the hook timeout plus this grace has
    /// passed goes back to the queue.
    pub claim_grace: Duration,
    /// Response bodies are truncated to this many bytes before storage.
    pub max_response_body_bytes: usize,
    /// `User-Agent` sent on every hook request.
    pub user_agent: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_size: 25,
            retry_policy: RetryPolicy::default(),
            claim_grace: DEFAULT_CLAIM_GRACE,
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
            user_agent: default_user_agent(),
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                |
    /// |--------------------------------|------------------------|
    /// | `HOOK_RETRY_POLL_SECS`         | `5`                    |
    /// | `HOOK_RETRY_BATCH_SIZE`        | `25`                   |
    /// | `HOOK_RETRY_BASE_DELAY_SECS`   | `30`                   |
    /// | `HOOK_RETRY_MAX_DELAY_SECS`    | `3600`                 |
    /// | `HOOK_RETRY_JITTER`            | `true`                 |
    /// | `HOOK_RETRY_CLAIM_GRACE_SECS`  | `60`                   |
    /// | `HOOK_MAX_RESPONSE_BODY_BYTES` | `65536`                |
    /// | `HOOK_USER_AGENT`              | `cms-hooks/<version>`  |
    ///
    /// Panics on unparseable values so a bad deployment fails at boot.
    pub fn from_env() -> Self {
        let poll_secs: u64 = env_or("HOOK_RETRY_POLL_SECS", 5);
        let batch_size: i64 = env_or("HOOK_RETRY_BATCH_SIZE", 25);
        let base_secs: u64 = env_or("HOOK_RETRY_BASE_DELAY_SECS", DEFAULT_BASE_DELAY.as_secs());
        let max_secs: u64 = env_or("HOOK_RETRY_MAX_DELAY_SECS", DEFAULT_MAX_DELAY.as_secs());
        let jitter: bool = env_or("HOOK_RETRY_JITTER", true);
        let grace_secs: u64 = env_or("HOOK_RETRY_CLAIM_GRACE_SECS", DEFAULT_CLAIM_GRACE.as_secs());
        let max_body: usize = env_or("HOOK_MAX_RESPONSE_BODY_BYTES", DEFAULT_MAX_RESPONSE_BODY_BYTES);
        let user_agent = std::env::var("HOOK_USER_AGENT").unwrap_or_else(|_| default_user_agent());

        Self {
            poll_interval: Duration::from_secs(poll_secs.max(1)),
            batch_size: batch_size.max(1),
            retry_policy: RetryPolicy {
                base_delay: Duration::from_secs(base_secs),
                max_delay: Duration::from_secs(max_secs.max(base_secs)),
                jitter,
            },
            claim_grace: Duration::from_secs(grace_secs).max(MIN_CLAIM_GRACE),
            max_response_body_bytes: max_body,
            user_agent,
        }
    }
}

fn default_user_agent() -> String {
    format!("cms-hooks/{}", env!("CARGO_PKG_VERSION"))
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
