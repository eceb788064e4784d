//! Repository for the `hook_executions` table.

use cms_core::execution::ExecutionStatus;
use cms_core::types::DbId;
use sqlx::PgPool;

use crate::models::hook_execution::{CreateHookExecution, ExecutionOutcome, HookExecution};

/// Column list for hook_executions queries.
const COLUMNS: &str = "id, hook_id, event_type, event_data, status, response_status, \
    response_body, error_message, execution_time_ms, retry_attempt, executed_at, completed_at";

/// Provides data-access methods for hook execution records.
pub struct HookExecutionRepo;

impl HookExecutionRepo {
    /// Record the start of an attempt (status `pending`).
    pub async fn create(
        pool: &PgPool,
        input: &CreateHookExecution,
    ) -> Result<HookExecution, sqlx::Error> {
        let query = format!(
            "INSERT INTO hook_executions (hook_id, event_type, event_data, retry_attempt)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HookExecution>(&query)
            .bind(input.hook_id)
            .bind(&input.event_type)
            .bind(&input.event_data)
            .bind(input.retry_attempt)
            .fetch_one(pool)
            .await
    }

    /// Write the outcome of an attempt over its `pending` row.
    ///
    /// Returns `None` if the row does not exist or already left `pending`.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        outcome: &ExecutionOutcome,
    ) -> Result<Option<HookExecution>, sqlx::Error> {
        let query = format!(
            "UPDATE hook_executions SET
                status            = $2,
                response_status   = $3,
                response_body     = $4,
                error_message     = $5,
                execution_time_ms = $6,
                completed_at      = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HookExecution>(&query)
            .bind(id)
            .bind(outcome.status.as_str())
            .bind(outcome.response_status)
            .bind(&outcome.response_body)
            .bind(&outcome.error_message)
            .bind(outcome.execution_time_ms)
            .fetch_optional(pool)
            .await
    }

    /// Find an execution record by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<HookExecution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hook_executions WHERE id = $1");
        sqlx::query_as::<_, HookExecution>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List execution records for a hook, newest first.
    pub async fn list_for_hook(
        pool: &PgPool,
        hook_id: DbId,
        limit: i64,
    ) -> Result<Vec<HookExecution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM hook_executions
             WHERE hook_id = $1
             ORDER BY executed_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, HookExecution>(&query)
            .bind(hook_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Count execution records for a hook with the given status.
    pub async fn count_by_status(
        pool: &PgPool,
        hook_id: DbId,
        status: ExecutionStatus,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM hook_executions WHERE hook_id = $1 AND status = $2",
        )
        .bind(hook_id)
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
