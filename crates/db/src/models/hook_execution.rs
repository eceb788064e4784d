//! Hook execution record models and DTOs.
//!
//! Defines the database row struct for `hook_executions`, the create DTO
//! used when an attempt starts, and the outcome written when it finishes.

use cms_core::error::CoreError;
use cms_core::execution::ExecutionStatus;
use cms_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `hook_executions` table: one delivery attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HookExecution {
    pub id: DbId,
    pub hook_id: DbId,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub status: String,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_ms: Option<i64>,
    pub retry_attempt: i32,
    pub executed_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl HookExecution {
    /// Parse the stored status column.
    pub fn execution_status(&self) -> Result<ExecutionStatus, CoreError> {
        ExecutionStatus::from_str(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for recording the start of an attempt (status `pending`).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHookExecution {
    pub hook_id: DbId,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub retry_attempt: i32,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Final result of an attempt, written over the `pending` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub execution_time_ms: i64,
}

impl ExecutionOutcome {
    /// A successful attempt that made no network call.
    pub fn no_op() -> Self {
        Self {
            status: ExecutionStatus::Success,
            response_status: None,
            response_body: None,
            error_message: None,
            execution_time_ms: 0,
        }
    }
}
