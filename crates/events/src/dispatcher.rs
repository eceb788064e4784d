//! Hook dispatcher.
//!
//! [`HookDispatcher::trigger_hooks`] fans an event out to every active hook
//! subscribed to it. Each attempt is recorded as a [`HookExecution`]; failed
//! attempts with budget left are queued for the
//! [`RetryScheduler`](crate::scheduler::RetryScheduler).
//!
//! Nothing in here returns an error to the code that raised the event.
//! Registry outages, persistence failures and delivery failures are logged
//! and the dispatch carries on with whatever it still can do.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use cms_core::execution::{should_retry, ExecutionStatus};
use cms_core::hooks::{default_headers, merge_headers};
use cms_core::template;
use cms_core::types::DbId;
use cms_db::models::hook::Hook;
use cms_db::models::hook_execution::{CreateHookExecution, ExecutionOutcome, HookExecution};
use cms_db::models::hook_retry::{CreateHookRetry, HookRetry};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::config::DispatchConfig;
use crate::delivery::{DeliveryRequest, HookClient};
use crate::registry::HookRegistry;
use crate::store::{HookStore, StoreError};

/// Header carrying the event tag on every hook request.
pub const EVENT_HEADER: &str = "X-Hook-Event";

/// Header carrying the zero-based attempt number.
pub const ATTEMPT_HEADER: &str = "X-Hook-Attempt";

const USER_AGENT_HEADER: &str = "User-Agent";

// ---------------------------------------------------------------------------
// AttemptReport
// ---------------------------------------------------------------------------

/// What a single attempt did.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub hook_id: DbId,
    /// The completed record, if it could be written.
    pub execution: Option<HookExecution>,
    pub outcome: ExecutionOutcome,
    /// The follow-up attempt, if one was queued.
    pub retry: Option<HookRetry>,
}

// ---------------------------------------------------------------------------
// HookDispatcher
// ---------------------------------------------------------------------------

pub struct HookDispatcher<S> {
    registry: HookRegistry<S>,
    client: HookClient,
    config: Arc<DispatchConfig>,
    /// Dispatches started by [`spawn_trigger`](Self::spawn_trigger), shared by clones.
    tasks: TaskTracker,
}

impl<S> Clone for HookDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            client: self.client.clone(),
            config: Arc::clone(&self.config),
            tasks: self.tasks.clone(),
        }
    }
}

impl<S: HookStore + 'static> HookDispatcher<S> {
    pub fn new(registry: HookRegistry<S>, client: HookClient, config: DispatchConfig) -> Self {
        Self {
            registry,
            client,
            config: Arc::new(config),
            tasks: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &HookRegistry<S> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run every active hook for `event_type` once, concurrently.
    ///
    /// Always returns normally. Hooks are independent: one hook failing or
    /// hanging until its timeout does not affect the others.
    pub async fn trigger_hooks(&self, event_type: &str, event_data: &Value) {
        let hooks = match self.registry.list_active_for_event(event_type).await {
            Ok(hooks) => hooks,
            Err(e) => {
                tracing::error!(
                    event_type,
                    error = %e,
                    "Failed to list hooks for event, skipping dispatch"
                );
                return;
            }
        };

        if hooks.is_empty() {
            tracing::debug!(event_type, "No active hooks for event");
            return;
        }

        tracing::debug!(event_type, hook_count = hooks.len(), "Dispatching event to hooks");

        let attempts = hooks
            .iter()
            .map(|hook| self.execute_attempt(hook, event_type, event_data, 0));
        futures::future::join_all(attempts).await;
    }

    /// Fire-and-forget form of [`trigger_hooks`](Self::trigger_hooks).
    ///
    /// The task is tracked; [`drain`](Self::drain) waits for it.
    pub fn spawn_trigger(&self, event_type: impl Into<String>, event_data: Value) -> JoinHandle<()> {
        let dispatcher = self.clone();
        let event_type = event_type.into();
        self.tasks.spawn(async move {
            dispatcher.trigger_hooks(&event_type, &event_data).await;
        })
    }

    /// Number of spawned dispatches still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every spawned dispatch to finish.
    ///
    /// Used at shutdown once no more events can arrive, so in-flight
    /// attempts get to record their outcome and queue their retries.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    /// One attempt of `hook`: record, deliver, record the outcome, and queue
    /// the next attempt if this one failed with budget left.
    pub async fn execute_attempt(
        &self,
        hook: &Hook,
        event_type: &str,
        event_data: &Value,
        retry_attempt: i32,
    ) -> AttemptReport {
        let store = self.registry.store();

        let pending = match store
            .create_execution(&CreateHookExecution {
                hook_id: hook.id,
                event_type: event_type.to_string(),
                event_data: event_data.clone(),
                retry_attempt,
            })
            .await
        {
            Ok(execution) => Some(execution),
            Err(e) => {
                tracing::error!(
                    hook_id = hook.id,
                    event_type,
                    retry_attempt,
                    error = %e,
                    "Failed to record hook execution, delivering anyway"
                );
                None
            }
        };

        let outcome = self.perform(hook, event_type, event_data, retry_attempt).await;

        let execution = match &pending {
            Some(record) => match store.complete_execution(record.id, &outcome).await {
                Ok(Some(completed)) => Some(completed),
                Ok(None) => {
                    tracing::warn!(
                        hook_id = hook.id,
                        execution_id = record.id,
                        "Execution record left pending state before completion"
                    );
                    None
                }
                Err(e) => {
                    tracing::error!(
                        hook_id = hook.id,
                        execution_id = record.id,
                        error = %e,
                        "Failed to record hook outcome"
                    );
                    None
                }
            },
            None => None,
        };

        log_outcome(hook, event_type, retry_attempt, &outcome);

        let retry = if outcome.status != ExecutionStatus::Failed {
            None
        } else if should_retry(retry_attempt, hook.retry_count) {
            // Only a record that actually reached `failed` moves to `retrying`.
            let origin_id = execution.as_ref().map(|e| e.id);
            self.schedule_retry(hook, origin_id, event_type, event_data, retry_attempt + 1)
                .await
        } else {
            tracing::warn!(
                hook_id = hook.id,
                event_type,
                retry_attempt,
                retry_count = hook.retry_count,
                "Hook retries exhausted"
            );
            None
        };

        AttemptReport {
            hook_id: hook.id,
            execution,
            outcome,
            retry,
        }
    }

    /// Queue `retry_attempt` for `hook` after the configured backoff.
    ///
    /// The origin record (if any) moves to `retrying` together with the
    /// queue insert. On failure nothing is queued, the origin stays `failed`
    /// and `None` is returned.
    pub async fn schedule_retry(
        &self,
        hook: &Hook,
        origin_execution_id: Option<DbId>,
        event_type: &str,
        event_data: &Value,
        retry_attempt: i32,
    ) -> Option<HookRetry> {
        let delay = self.config.retry_policy.delay_for(retry_attempt);
        let due_at = due_after(Utc::now(), delay);

        let input = CreateHookRetry {
            hook_id: hook.id,
            origin_execution_id,
            event_type: event_type.to_string(),
            event_data: event_data.clone(),
            retry_attempt,
            due_at,
        };

        match self.registry.store().schedule_retry(&input).await {
            Ok(retry) => {
                tracing::info!(
                    hook_id = hook.id,
                    retry_id = retry.id,
                    retry_attempt,
                    delay_secs = delay.as_secs(),
                    "Hook retry scheduled"
                );
                Some(retry)
            }
            Err(e) => {
                tracing::error!(
                    hook_id = hook.id,
                    retry_attempt,
                    error = %e,
                    "Failed to schedule hook retry"
                );
                None
            }
        }
    }

    /// Fire `hook` once with `event_data`, regardless of its active flag.
    ///
    /// Unlike dispatch, persistence errors are returned and no retry is ever
    /// queued.
    pub async fn test_hook(
        &self,
        hook: &Hook,
        event_data: &Value,
    ) -> Result<HookExecution, StoreError> {
        let store = self.registry.store();
        let pending = store
            .create_execution(&CreateHookExecution {
                hook_id: hook.id,
                event_type: hook.event_type.clone(),
                event_data: event_data.clone(),
                retry_attempt: 0,
            })
            .await?;

        let outcome = self.perform(hook, &hook.event_type, event_data, 0).await;
        log_outcome(hook, &hook.event_type, 0, &outcome);

        let completed = store.complete_execution(pending.id, &outcome).await?;
        Ok(completed.unwrap_or(pending))
    }

    /// Render, send and classify. Never touches the store.
    async fn perform(
        &self,
        hook: &Hook,
        event_type: &str,
        event_data: &Value,
        retry_attempt: i32,
    ) -> ExecutionOutcome {
        let Some(url) = hook.endpoint_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            tracing::debug!(hook_id = hook.id, "Hook has no endpoint, recorded as no-op");
            return ExecutionOutcome::no_op();
        };

        let method = match hook.method() {
            Ok(method) => method,
            Err(e) => return failed_outcome(e.to_string(), 0),
        };

        let payload = template::render(&hook.payload_template, event_data);
        let headers = merge_headers(
            self.base_headers(event_type, retry_attempt),
            &hook.headers,
        );

        let started = Instant::now();
        let result = self
            .client
            .send(&DeliveryRequest {
                method,
                url,
                headers: &headers,
                payload: &payload,
                timeout: hook.timeout(),
            })
            .await;
        let execution_time_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        match result {
            Ok(response) => {
                let response = response.truncated(self.config.max_response_body_bytes);
                let error_message = response.error().map(|e| e.to_string());
                ExecutionOutcome {
                    status: if error_message.is_none() {
                        ExecutionStatus::Success
                    } else {
                        ExecutionStatus::Failed
                    },
                    response_status: Some(i32::from(response.status)),
                    response_body: Some(response.body),
                    error_message,
                    execution_time_ms,
                }
            }
            Err(e) => failed_outcome(e.to_string(), execution_time_ms),
        }
    }

    fn base_headers(&self, event_type: &str, retry_attempt: i32) -> Vec<(String, String)> {
        let mut headers = default_headers();
        headers.push((USER_AGENT_HEADER.to_string(), self.config.user_agent.clone()));
        headers.push((EVENT_HEADER.to_string(), event_type.to_string()));
        headers.push((ATTEMPT_HEADER.to_string(), retry_attempt.to_string()));
        headers
    }
}

fn failed_outcome(error_message: String, execution_time_ms: i64) -> ExecutionOutcome {
    ExecutionOutcome {
        status: ExecutionStatus::Failed,
        response_status: None,
        response_body: None,
        error_message: Some(error_message),
        execution_time_ms,
    }
}

fn due_after(now: DateTime<Utc>, delay: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn log_outcome(hook: &Hook, event_type: &str, retry_attempt: i32, outcome: &ExecutionOutcome) {
    match outcome.status {
        ExecutionStatus::Success => tracing::info!(
            hook_id = hook.id,
            event_type,
            retry_attempt,
            response_status = outcome.response_status,
            execution_time_ms = outcome.execution_time_ms,
            "Hook delivered"
        ),
        _ => tracing::warn!(
            hook_id = hook.id,
            event_type,
            retry_attempt,
            response_status = outcome.response_status,
            execution_time_ms = outcome.execution_time_ms,
            error = outcome.error_message.as_deref().unwrap_or_default(),
            "Hook delivery failed"
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
