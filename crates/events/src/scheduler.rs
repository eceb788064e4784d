//! Durable retry scheduler.
//!
//! [`RetryScheduler`] runs as a background task, polling the retry queue for
//! due attempts. Each poll first returns expired claims to the queue (a
//! worker that died mid-attempt), then claims a batch, re-loads each hook and
//! runs the attempt through the dispatcher. Claims are exclusive and leased
//! for longer than the hook's timeout, so several schedulers may poll the
//! same database without running one attempt twice.

use chrono::{DateTime, Utc};
use cms_db::models::hook::Hook;
use cms_db::models::hook_retry::HookRetry;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::HookDispatcher;
use crate::store::{HookStore, StoreError};

// ---------------------------------------------------------------------------
// RetryScheduler
// ---------------------------------------------------------------------------

pub struct RetryScheduler<S> {
    dispatcher: HookDispatcher<S>,
}

impl<S: HookStore + 'static> RetryScheduler<S> {
    pub fn new(dispatcher: HookDispatcher<S>) -> Self {
        Self { dispatcher }
    }

    /// Run the polling loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.dispatcher.config().poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            poll_secs = self.dispatcher.config().poll_interval.as_secs(),
            "Retry scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Retry scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.process_due().await {
                        tracing::error!(error = %e, "Failed to process due hook retries");
                    }
                }
            }
        }
    }

    /// One poll: release stale claims, then run every due retry in a batch.
    ///
    /// Returns the number of retries claimed.
    pub async fn process_due(&self) -> Result<usize, StoreError> {
        let config = self.dispatcher.config();
        let store = self.dispatcher.registry().store();

        let released = store.release_stale_claims().await?;
        if released > 0 {
            tracing::warn!(released, "Released stale hook retry claims");
        }

        let due = store
            .claim_due_retries(config.batch_size, config.claim_grace)
            .await?;
        if due.is_empty() {
            return Ok(0);
        }

        tracing::debug!(count = due.len(), "Processing due hook retries");
        futures::future::join_all(due.iter().map(|retry| self.run_retry(retry))).await;

        Ok(due.len())
    }

    /// Run a claimed retry and mark it completed.
    ///
    /// A store failure while loading the hook leaves the claim in place; it
    /// returns to the queue once the lease expires.
    async fn run_retry(&self, retry: &HookRetry) {
        let store = self.dispatcher.registry().store();

        let hook = match store.find_hook(retry.hook_id).await {
            Ok(hook) => hook,
            Err(e) => {
                tracing::error!(
                    retry_id = retry.id,
                    hook_id = retry.hook_id,
                    error = %e,
                    "Failed to load hook for retry"
                );
                return;
            }
        };

        match hook {
            Some(hook) if hook.is_active && !lease_covers(retry, &hook, Utc::now()) => {
                // The timeout grew after the claim was taken; let the lease
                // run out and re-claim with the new timeout.
                tracing::warn!(
                    retry_id = retry.id,
                    hook_id = retry.hook_id,
                    "Retry claim too short for hook timeout, deferring"
                );
                return;
            }
            Some(hook) if hook.is_active => {
                self.dispatcher
                    .execute_attempt(&hook, &retry.event_type, &retry.event_data, retry.retry_attempt)
                    .await;
            }
            Some(_) => tracing::info!(
                retry_id = retry.id,
                hook_id = retry.hook_id,
                "Hook deactivated, abandoning retry"
            ),
            None => tracing::info!(
                retry_id = retry.id,
                hook_id = retry.hook_id,
                "Hook deleted, abandoning retry"
            ),
        }

        self.complete(retry).await;
    }

    async fn complete(&self, retry: &HookRetry) {
        match self.dispatcher.registry().store().complete_retry(retry).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                retry_id = retry.id,
                "Hook retry was completed or re-claimed elsewhere"
            ),
            Err(e) => tracing::error!(
                retry_id = retry.id,
                error = %e,
                "Failed to complete hook retry, it will run again after the lease"
            ),
        }
    }
}

/// Whether the claim on `retry` outlasts a full attempt of `hook` from `now`.
fn lease_covers(retry: &HookRetry, hook: &Hook, now: DateTime<Utc>) -> bool {
    let Some(deadline) = retry.lease_expires_at else {
        return false;
    };
    chrono::Duration::from_std(hook.timeout())
        .ok()
        .and_then(|timeout| now.checked_add_signed(timeout))
        .is_some_and(|finish| finish <= deadline)
}
