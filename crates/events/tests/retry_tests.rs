//! Retry scheduling and the durable retry queue.

mod common;

use std::time::Duration;

use cms_core::retry::RetryPolicy;
use cms_events::HookStore;
use common::{hook_input, test_config, Harness};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn always_failing() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path("/hook"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;
    server
}

/// Fails `failures` times, then answers 200.
async fn flaky(failures: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(failures)
        .mount(&server)
        .await;
    Mock::given(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn hook_url(server: &MockServer) -> Option<String> {
    Some(format!("{}/hook", server.uri()))
}

// ---------------------------------------------------------------------------
// process_due
// ---------------------------------------------------------------------------

#[tokio::test]
async fn due_retry_runs_and_succeeds() {
    let server = flaky(1).await;
    let harness = Harness::new();
    let mut input = hook_input("content.published", hook_url(&server));
    input.retry_count = Some(2);
    harness.insert_hook(input).await;

    harness
        .dispatcher
        .trigger_hooks("content.published", &json!({"id": 1}))
        .await;

    let processed = harness.scheduler().process_due().await.unwrap();
    assert_eq!(processed, 1);

    let executions = harness.store.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].status, "retrying");
    assert_eq!(executions[1].status, "success");
    assert_eq!(executions[1].retry_attempt, 1);
    assert_eq!(executions[1].event_data, json!({"id": 1}));

    let retries = harness.store.retries();
    assert_eq!(retries.len(), 1);
    assert!(retries[0].completed_at.is_some());

    // Nothing left to do.
    assert_eq!(harness.scheduler().process_due().await.unwrap(), 0);
}

#[tokio::test]
async fn retry_chain_stops_when_budget_is_spent() {
    let server = always_failing().await;
    let harness = Harness::new();
    let mut input = hook_input("content.published", hook_url(&server));
    input.retry_count = Some(2);
    harness.insert_hook(input).await;

    harness
        .dispatcher
        .trigger_hooks("content.published", &json!({}))
        .await;
    let scheduler = harness.scheduler();
    assert_eq!(scheduler.process_due().await.unwrap(), 1);
    assert_eq!(scheduler.process_due().await.unwrap(), 1);
    assert_eq!(scheduler.process_due().await.unwrap(), 0);

    let executions = harness.store.executions();
    let summary: Vec<(&str, i32)> = executions
        .iter()
        .map(|e| (e.status.as_str(), e.retry_attempt))
        .collect();
    assert_eq!(
        summary,
        vec![("retrying", 1), ("retrying", 2), ("failed", 2)]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert!(harness.store.retries().iter().all(|r| r.completed_at.is_some()));
}

#[tokio::test]
async fn retry_attempt_header_counts_up() {
    let server = MockServer::start().await;
    Mock::given(path("/hook"))
        .and(header("x-hook-attempt", "0"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/hook"))
        .and(header("x-hook-attempt", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new();
    harness
        .insert_hook(hook_input("media.uploaded", hook_url(&server)))
        .await;

    harness
        .dispatcher
        .trigger_hooks("media.uploaded", &json!({}))
        .await;
    harness.scheduler().process_due().await.unwrap();

    assert_eq!(harness.store.executions()[1].status, "success");
}

#[tokio::test]
async fn retry_is_not_run_before_it_is_due() {
    let server = always_failing().await;
    let mut config = test_config();
    config.retry_policy = RetryPolicy::fixed(Duration::from_secs(3600), Duration::from_secs(3600));
    let harness = Harness::with_config(config);
    harness
        .insert_hook(hook_input("content.published", hook_url(&server)))
        .await;

    let before = chrono::Utc::now();
    harness
        .dispatcher
        .trigger_hooks("content.published", &json!({}))
        .await;

    let retry = harness.store.retries()[0].clone();
    assert!(retry.due_at >= before + chrono::Duration::seconds(3600));

    assert_eq!(harness.scheduler().process_due().await.unwrap(), 0);
    assert_eq!(harness.store.executions().len(), 1);
}

#[tokio::test]
async fn deactivated_hook_abandons_its_retry() {
    let server = always_failing().await;
    let harness = Harness::new();
    let hook = harness
        .insert_hook(hook_input("content.published", hook_url(&server)))
        .await;

    harness
        .dispatcher
        .trigger_hooks("content.published", &json!({}))
        .await;
    harness.registry.set_active(hook.id, false).await.unwrap();

    assert_eq!(harness.scheduler().process_due().await.unwrap(), 1);

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(harness.store.executions().len(), 1);
    assert!(harness.store.retries()[0].completed_at.is_some());
}

#[tokio::test]
async fn stale_claim_is_recovered() {
    let server = flaky(1).await;
    let mut config = test_config();
    config.claim_grace = Duration::from_millis(200);
    let harness = Harness::with_config(config.clone());
    let mut input = hook_input("content.published", hook_url(&server));
    input.timeout_seconds = Some(1);
    harness.insert_hook(input).await;

    harness
        .dispatcher
        .trigger_hooks("content.published", &json!({}))
        .await;

    // A worker claims the retry and dies before completing it.
    let claimed = harness
        .store
        .claim_due_retries(10, config.claim_grace)
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);

    // Still leased: nothing to pick up yet.
    assert_eq!(harness.scheduler().process_due().await.unwrap(), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(harness.scheduler().process_due().await.unwrap(), 1);
    assert_eq!(harness.store.executions()[1].status, "success");
    assert!(harness.store.retries()[0].completed_at.is_some());
}

#[tokio::test]
async fn slow_attempt_is_not_claimed_by_a_second_scheduler() {
    let server = MockServer::start().await;
    Mock::given(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    // The grace alone is shorter than the delivery; the hook timeout is not.
    let mut config = test_config();
    config.claim_grace = Duration::from_secs(1);
    let harness = Harness::with_config(config);
    let mut input = hook_input("content.published", hook_url(&server));
    input.timeout_seconds = Some(3);
    harness.insert_hook(input).await;

    harness
        .dispatcher
        .trigger_hooks("content.published", &json!({}))
        .await;

    let first = harness.scheduler();
    let running = tokio::spawn(async move { first.process_due().await });

    tokio::time::sleep(Duration::from_millis(1300)).await;
    let second = harness.scheduler().process_due().await.unwrap();
    assert_eq!(second, 0);

    assert_eq!(running.await.unwrap().unwrap(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    let executions = harness.store.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[1].status, "success");
    assert!(harness.store.retries()[0].completed_at.is_some());
}

#[tokio::test]
async fn rejected_retry_insert_is_swallowed() {
    let harness = Harness::new();
    let hook = harness.insert_hook(hook_input("content.published", None)).await;
    harness.store.set_fail_writes(true);

    let retry = harness
        .dispatcher
        .schedule_retry(&hook, None, "content.published", &json!({}), 1)
        .await;

    assert!(retry.is_none());
    assert!(harness.store.retries().is_empty());
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_processes_retries_until_cancelled() {
    let server = flaky(1).await;
    let harness = Harness::new();
    harness
        .insert_hook(hook_input("content.updated", hook_url(&server)))
        .await;

    let cancel = CancellationToken::new();
    let scheduler = harness.scheduler();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { scheduler.run(token).await });

    harness
        .dispatcher
        .trigger_hooks("content.updated", &json!({}))
        .await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while harness.store.executions().len() < 2 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(harness.store.executions()[1].status, "success");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler should stop promptly")
        .expect("scheduler task should not panic");
}
