//! Retry queue models.
//!
//! A `hook_retries` row is a follow-up attempt waiting for its `due_at`.
//! Rows are claimed by a scheduler before running and completed afterwards,
//! so a restart never loses a queued attempt. A claim is held until
//! `lease_expires_at`, which always outlasts the hook's own timeout.

use cms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `hook_retries` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HookRetry {
    pub id: DbId,
    pub hook_id: DbId,
    pub origin_execution_id: Option<DbId>,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub retry_attempt: i32,
    pub due_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub lease_expires_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Input for queueing a follow-up attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHookRetry {
    pub hook_id: DbId,
    /// The failed record that moves to `retrying`, if it was persisted.
    pub origin_execution_id: Option<DbId>,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub retry_attempt: i32,
    pub due_at: Timestamp,
}
