//! Repository for the `hook_retries` queue.

use cms_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::hook_retry::{CreateHookRetry, HookRetry};

/// Column list for hook_retries queries.
const COLUMNS: &str = "id, hook_id, origin_execution_id, event_type, event_data, \
    retry_attempt, due_at, claimed_at, lease_expires_at, completed_at, created_at";

/// Provides queue operations for follow-up delivery attempts.
pub struct HookRetryRepo;

impl HookRetryRepo {
    /// Queue a follow-up attempt and flip the originating record to `retrying`.
    ///
    /// Both writes happen in one transaction: either the retry is queued and
    /// the origin row says `retrying`, or nothing changes. The origin row is
    /// only touched while it is `failed`.
    pub async fn enqueue(pool: &PgPool, input: &CreateHookRetry) -> Result<HookRetry, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO hook_retries
                (hook_id, origin_execution_id, event_type, event_data, retry_attempt, due_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let retry = sqlx::query_as::<_, HookRetry>(&query)
            .bind(input.hook_id)
            .bind(input.origin_execution_id)
            .bind(&input.event_type)
            .bind(&input.event_data)
            .bind(input.retry_attempt)
            .bind(input.due_at)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(execution_id) = input.origin_execution_id {
            sqlx::query(
                "UPDATE hook_executions SET status = 'retrying', retry_attempt = $2 \
                 WHERE id = $1 AND status = 'failed'",
            )
            .bind(execution_id)
            .bind(input.retry_attempt)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(retry)
    }

    /// Claim up to `limit` due, unclaimed retries.
    ///
    /// `FOR UPDATE SKIP LOCKED` keeps concurrent schedulers from claiming the
    /// same row. Each claim is leased for the hook's `timeout_seconds` plus
    /// `grace_secs`, so it cannot expire while an attempt is still in flight.
    pub async fn claim_due(
        pool: &PgPool,
        limit: i64,
        grace_secs: f64,
    ) -> Result<Vec<HookRetry>, sqlx::Error> {
        let query = format!(
            "UPDATE hook_retries SET
                 claimed_at = NOW(),
                 lease_expires_at = NOW() + make_interval(secs => $2::float8 + COALESCE(
                     (SELECT h.timeout_seconds FROM hooks h WHERE h.id = hook_retries.hook_id),
                     0
                 ))
             WHERE id IN (
                 SELECT id FROM hook_retries
                 WHERE completed_at IS NULL
                   AND claimed_at IS NULL
                   AND due_at <= NOW()
                 ORDER BY due_at ASC
                 LIMIT $1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        let mut claimed = sqlx::query_as::<_, HookRetry>(&query)
            .bind(limit)
            .bind(grace_secs)
            .fetch_all(pool)
            .await?;
        claimed.sort_by_key(|r| r.due_at);
        Ok(claimed)
    }

    /// Mark a claimed retry as done.
    ///
    /// Only succeeds while the row still carries the claim identified by
    /// `claimed_at`; a claim that expired and was taken over is left alone.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        claimed_at: Option<Timestamp>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE hook_retries SET completed_at = NOW() \
             WHERE id = $1 AND completed_at IS NULL AND claimed_at IS NOT DISTINCT FROM $2",
        )
        .bind(id)
        .bind(claimed_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return claims whose lease ran out without completion to the queue.
    pub async fn release_stale_claims(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE hook_retries SET claimed_at = NULL, lease_expires_at = NULL \
             WHERE completed_at IS NULL \
               AND claimed_at IS NOT NULL \
               AND lease_expires_at < NOW()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List queued (not yet completed) retries for a hook, soonest first.
    pub async fn list_pending_for_hook(
        pool: &PgPool,
        hook_id: DbId,
    ) -> Result<Vec<HookRetry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM hook_retries
             WHERE hook_id = $1 AND completed_at IS NULL
             ORDER BY due_at ASC"
        );
        sqlx::query_as::<_, HookRetry>(&query)
            .bind(hook_id)
            .fetch_all(pool)
            .await
    }
}
