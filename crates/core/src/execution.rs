//! Execution record status machine and outcome helpers.
//!
//! One execution record exists per delivery attempt. Its status moves
//! `pending -> success | failed`, and a failed attempt that still has retry
//! budget moves on to `retrying` once its follow-up attempt is queued.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of execution records returned by the per-hook history view.
pub const EXECUTION_HISTORY_LIMIT: i64 = 50;

/// Default cap on stored response body size in bytes.
pub const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 65_536;

// ---------------------------------------------------------------------------
// ExecutionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Success,
    Failed,
    Retrying,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "retrying" => Ok(Self::Retrying),
            _ => Err(CoreError::Validation(format!(
                "Invalid execution status: '{s}'. Must be one of: pending, success, failed, retrying"
            ))),
        }
    }

    /// Whether the attempt has finished and will never change again.
    ///
    /// `retrying` is terminal for the record itself: the chain continues on
    /// a new record.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a record may move from `self` to `next`.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Success)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Retrying)
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome helpers
// ---------------------------------------------------------------------------

/// Whether an HTTP status code counts as a successful delivery (2xx).
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Build the error message stored for a non-2xx response.
pub fn http_failure_message(status: u16, body: &str) -> String {
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

/// Truncate a response body to at most `max_bytes`, respecting char boundaries.
pub fn truncate_body(body: &str, max_bytes: usize) -> &str {
    if body.len() <= max_bytes {
        return body;
    }
    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Whether a failed attempt still has retry budget.
///
/// `retry_attempt` is zero-based: the first delivery is attempt 0, so a hook
/// with `retry_count = 2` makes at most three attempts in total.
pub fn should_retry(retry_attempt: i32, retry_count: i32) -> bool {
    retry_attempt < retry_count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
