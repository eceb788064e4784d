//! Repository tests for hooks, execution records and the retry queue.
//!
//! Run with `--features integration` against a PostgreSQL `DATABASE_URL`.

#![cfg(feature = "integration")]

use chrono::{Duration, Utc};
use cms_core::execution::ExecutionStatus;
use cms_db::models::hook::{CreateHook, UpdateHook};
use cms_db::models::hook_execution::{CreateHookExecution, ExecutionOutcome};
use cms_db::models::hook_retry::CreateHookRetry;
use cms_db::repositories::{HookExecutionRepo, HookRepo, HookRetryRepo};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_hook(event_type: &str) -> CreateHook {
    CreateHook {
        name: format!("{event_type} hook"),
        event_type: event_type.to_string(),
        endpoint_url: Some("https://example.com/hook".to_string()),
        ..Default::default()
    }
}

fn new_execution(hook_id: i64) -> CreateHookExecution {
    CreateHookExecution {
        hook_id,
        event_type: "content.published".to_string(),
        event_data: json!({"id": 1}),
        retry_attempt: 0,
    }
}

fn failed_outcome() -> ExecutionOutcome {
    ExecutionOutcome {
        status: ExecutionStatus::Failed,
        response_status: Some(500),
        response_body: Some("boom".to_string()),
        error_message: Some("HTTP 500: boom".to_string()),
        execution_time_ms: 12,
    }
}

fn new_retry(hook_id: i64, origin: Option<i64>, due_in_secs: i64) -> CreateHookRetry {
    CreateHookRetry {
        hook_id,
        origin_execution_id: origin,
        event_type: "content.published".to_string(),
        event_data: json!({"id": 1}),
        retry_attempt: 1,
        due_at: Utc::now() + Duration::seconds(due_in_secs),
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_applies_defaults(pool: PgPool) {
    let mut input = new_hook("content.published");
    input.http_method = Some("put".to_string());
    let hook = HookRepo::create(&pool, &input).await.unwrap();

    assert_eq!(hook.http_method, "PUT");
    assert_eq!(hook.headers, json!({}));
    assert_eq!(hook.payload_template, json!({}));
    assert!(hook.is_active);
    assert_eq!(hook.retry_count, 3);
    assert_eq!(hook.timeout_seconds, 30);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn active_listing_filters_event_and_flag(pool: PgPool) {
    let wanted = HookRepo::create(&pool, &new_hook("content.published")).await.unwrap();
    HookRepo::create(&pool, &new_hook("media.uploaded")).await.unwrap();
    let mut inactive = new_hook("content.published");
    inactive.is_active = Some(false);
    HookRepo::create(&pool, &inactive).await.unwrap();

    let hooks = HookRepo::list_active_for_event(&pool, "content.published")
        .await
        .unwrap();
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].id, wanted.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_is_partial(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.updated")).await.unwrap();

    let updated = HookRepo::update(
        &pool,
        hook.id,
        &UpdateHook {
            retry_count: Some(0),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.retry_count, 0);
    assert_eq!(updated.endpoint_url, hook.endpoint_url);
    assert!(updated.updated_at >= hook.updated_at);
    assert!(HookRepo::update(&pool, 9999, &UpdateHook::default())
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_can_clear_endpoint_url(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.archived")).await.unwrap();

    let changed = HookRepo::update(
        &pool,
        hook.id,
        &UpdateHook {
            endpoint_url: Some(Some("https://example.com/other".to_string())),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(changed.endpoint_url.as_deref(), Some("https://example.com/other"));

    let cleared = HookRepo::update(
        &pool,
        hook.id,
        &UpdateHook {
            endpoint_url: Some(None),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(cleared.endpoint_url.is_none());
    assert_eq!(cleared.name, hook.name);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_method_is_rejected_by_schema(pool: PgPool) {
    let mut input = new_hook("content.updated");
    input.http_method = Some("TRACE".to_string());
    assert!(HookRepo::create(&pool, &input).await.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_cascades(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.deleted")).await.unwrap();
    let execution = HookExecutionRepo::create(&pool, &new_execution(hook.id)).await.unwrap();
    HookRetryRepo::enqueue(&pool, &new_retry(hook.id, None, 60)).await.unwrap();

    assert!(HookRepo::delete(&pool, hook.id).await.unwrap());
    assert!(HookExecutionRepo::find_by_id(&pool, execution.id)
        .await
        .unwrap()
        .is_none());
    assert!(HookRetryRepo::list_pending_for_hook(&pool, hook.id)
        .await
        .unwrap()
        .is_empty());
}

// ---------------------------------------------------------------------------
// Execution records
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn complete_only_updates_pending(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.published")).await.unwrap();
    let execution = HookExecutionRepo::create(&pool, &new_execution(hook.id)).await.unwrap();
    assert_eq!(execution.status, "pending");

    let completed = HookExecutionRepo::complete(&pool, execution.id, &failed_outcome())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status, "failed");
    assert_eq!(completed.response_status, Some(500));
    assert!(completed.completed_at.is_some());

    assert!(HookExecutionRepo::complete(&pool, execution.id, &ExecutionOutcome::no_op())
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_for_hook_is_newest_first_and_limited(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.published")).await.unwrap();
    for _ in 0..5 {
        HookExecutionRepo::create(&pool, &new_execution(hook.id)).await.unwrap();
    }

    let executions = HookExecutionRepo::list_for_hook(&pool, hook.id, 3).await.unwrap();
    assert_eq!(executions.len(), 3);
    assert!(executions[0].id > executions[1].id);

    let pending = HookExecutionRepo::count_by_status(&pool, hook.id, ExecutionStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending, 5);
}

// ---------------------------------------------------------------------------
// Retry queue
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn enqueue_flips_failed_origin_to_retrying(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.published")).await.unwrap();
    let execution = HookExecutionRepo::create(&pool, &new_execution(hook.id)).await.unwrap();
    HookExecutionRepo::complete(&pool, execution.id, &failed_outcome())
        .await
        .unwrap();

    let retry = HookRetryRepo::enqueue(&pool, &new_retry(hook.id, Some(execution.id), 0))
        .await
        .unwrap();
    assert_eq!(retry.origin_execution_id, Some(execution.id));

    let origin = HookExecutionRepo::find_by_id(&pool, execution.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(origin.status, "retrying");
    assert_eq!(origin.retry_attempt, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_is_exclusive_and_due_only(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.published")).await.unwrap();
    let due = HookRetryRepo::enqueue(&pool, &new_retry(hook.id, None, -5)).await.unwrap();
    HookRetryRepo::enqueue(&pool, &new_retry(hook.id, None, 3600)).await.unwrap();

    let claimed = HookRetryRepo::claim_due(&pool, 10, 60.0).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, due.id);
    assert!(claimed[0].claimed_at.is_some());

    assert!(HookRetryRepo::claim_due(&pool, 10, 60.0).await.unwrap().is_empty());

    assert!(HookRetryRepo::complete(&pool, due.id, claimed[0].claimed_at).await.unwrap());
    assert!(!HookRetryRepo::complete(&pool, due.id, claimed[0].claimed_at).await.unwrap());
    assert_eq!(
        HookRetryRepo::list_pending_for_hook(&pool, hook.id).await.unwrap().len(),
        1
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_lease_covers_hook_timeout(pool: PgPool) {
    let mut input = new_hook("content.published");
    input.timeout_seconds = Some(120);
    let hook = HookRepo::create(&pool, &input).await.unwrap();
    HookRetryRepo::enqueue(&pool, &new_retry(hook.id, None, -5)).await.unwrap();

    let claimed = HookRetryRepo::claim_due(&pool, 10, 30.0).await.unwrap();
    let claimed_at = claimed[0].claimed_at.unwrap();
    let lease_expires_at = claimed[0].lease_expires_at.unwrap();
    assert_eq!(lease_expires_at - claimed_at, Duration::seconds(150));

    // Well inside the lease: nothing is released.
    assert_eq!(HookRetryRepo::release_stale_claims(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_claims_are_released(pool: PgPool) {
    let hook = HookRepo::create(&pool, &new_hook("content.published")).await.unwrap();
    let retry = HookRetryRepo::enqueue(&pool, &new_retry(hook.id, None, -5)).await.unwrap();
    let claimed = HookRetryRepo::claim_due(&pool, 10, 60.0).await.unwrap();
    assert_eq!(claimed.len(), 1);

    sqlx::query(
        "UPDATE hook_retries SET lease_expires_at = NOW() - INTERVAL '1 second' WHERE id = $1",
    )
    .bind(retry.id)
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(HookRetryRepo::release_stale_claims(&pool).await.unwrap(), 1);
    let reclaimed = HookRetryRepo::claim_due(&pool, 10, 60.0).await.unwrap();
    assert_eq!(reclaimed.len(), 1);

    // The expired claim can no longer complete the row; the new one can.
    assert!(!HookRetryRepo::complete(&pool, retry.id, claimed[0].claimed_at).await.unwrap());
    assert!(HookRetryRepo::complete(&pool, retry.id, reclaimed[0].claimed_at).await.unwrap());
}
