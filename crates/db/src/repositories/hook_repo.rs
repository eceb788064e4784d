//! Repository for the `hooks` table.

use cms_core::types::DbId;
use sqlx::PgPool;

use crate::models::hook::{CreateHook, Hook, UpdateHook};

/// Column list for hooks queries.
const COLUMNS: &str = "id, name, event_type, endpoint_url, http_method, headers, \
    payload_template, is_active, retry_count, timeout_seconds, created_at, updated_at";

/// Provides CRUD operations for hooks.
pub struct HookRepo;

impl HookRepo {
    /// Insert a new hook, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateHook) -> Result<Hook, sqlx::Error> {
        let query = format!(
            "INSERT INTO hooks
                (name, event_type, endpoint_url, http_method, headers, payload_template,
                 is_active, retry_count, timeout_seconds)
             VALUES ($1, $2, $3, COALESCE(UPPER($4), 'POST'), COALESCE($5, '{{}}'::jsonb),
                     COALESCE($6, '{{}}'::jsonb), COALESCE($7, true), COALESCE($8, 3),
                     COALESCE($9, 30))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Hook>(&query)
            .bind(input.name.trim())
            .bind(&input.event_type)
            .bind(&input.endpoint_url)
            .bind(&input.http_method)
            .bind(&input.headers)
            .bind(&input.payload_template)
            .bind(input.is_active)
            .bind(input.retry_count)
            .bind(input.timeout_seconds)
            .fetch_one(pool)
            .await
    }

    /// Find a hook by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Hook>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hooks WHERE id = $1");
        sqlx::query_as::<_, Hook>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all hooks, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Hook>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hooks ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Hook>(&query).fetch_all(pool).await
    }

    /// List active hooks subscribed to `event_type`.
    pub async fn list_active_for_event(
        pool: &PgPool,
        event_type: &str,
    ) -> Result<Vec<Hook>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM hooks \
             WHERE is_active = true AND event_type = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Hook>(&query)
            .bind(event_type)
            .fetch_all(pool)
            .await
    }

    /// Update an existing hook. Returns the updated row, or `None` if not found.
    ///
    /// An explicit `null` endpoint URL clears the column.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateHook,
    ) -> Result<Option<Hook>, sqlx::Error> {
        let query = format!(
            "UPDATE hooks SET
                name             = COALESCE($1, name),
                event_type       = COALESCE($2, event_type),
                endpoint_url     = CASE WHEN $3 THEN $4 ELSE endpoint_url END,
                http_method      = COALESCE(UPPER($5), http_method),
                headers          = COALESCE($6, headers),
                payload_template = COALESCE($7, payload_template),
                is_active        = COALESCE($8, is_active),
                retry_count      = COALESCE($9, retry_count),
                timeout_seconds  = COALESCE($10, timeout_seconds)
             WHERE id = $11
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Hook>(&query)
            .bind(input.name.as_deref().map(str::trim))
            .bind(&input.event_type)
            .bind(input.endpoint_url.is_some())
            .bind(input.new_endpoint_url())
            .bind(&input.http_method)
            .bind(&input.headers)
            .bind(&input.payload_template)
            .bind(input.is_active)
            .bind(input.retry_count)
            .bind(input.timeout_seconds)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a hook by its ID. Executions and queued retries cascade.
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM hooks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set a hook's active flag. Returns the updated row, or `None` if not found.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        is_active: bool,
    ) -> Result<Option<Hook>, sqlx::Error> {
        let query = format!("UPDATE hooks SET is_active = $1 WHERE id = $2 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Hook>(&query)
            .bind(is_active)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
