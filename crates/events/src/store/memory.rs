//! In-process [`HookStore`].
//!
//! Mirrors the PostgreSQL semantics closely enough for the dispatcher and
//! scheduler to be exercised without a database: column defaults on create,
//! partial updates, `pending`-only completion, atomic retry scheduling and
//! exclusive claims. Reads and writes can be made to fail on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cms_core::execution::ExecutionStatus;
use cms_core::hooks::{DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT_SECS};
use cms_core::types::DbId;
use cms_db::models::hook::{CreateHook, Hook, UpdateHook};
use cms_db::models::hook_execution::{CreateHookExecution, ExecutionOutcome, HookExecution};
use cms_db::models::hook_retry::{CreateHookRetry, HookRetry};

use super::{HookStore, StoreError};

#[derive(Default)]
struct Tables {
    hooks: Vec<Hook>,
    executions: Vec<HookExecution>,
    retries: Vec<HookRetry>,
    next_id: DbId,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Mutex-guarded tables. No lock is held across an `.await`.
#[derive(Default)]
pub struct MemoryHookStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryHookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read return [`StoreError::Unavailable`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write return [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn hooks(&self) -> Vec<Hook> {
        self.lock().hooks.clone()
    }

    /// All execution records in insertion order.
    pub fn executions(&self) -> Vec<HookExecution> {
        self.lock().executions.clone()
    }

    /// All queued retries, completed or not, in insertion order.
    pub fn retries(&self) -> Vec<HookRetry> {
        self.lock().retries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl HookStore for MemoryHookStore {
    // -- hooks --------------------------------------------------------------

    async fn create_hook(&self, input: &CreateHook) -> Result<Hook, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        let now = Utc::now();
        let hook = Hook {
            id: tables.next_id(),
            name: input.name.trim().to_string(),
            event_type: input.event_type.clone(),
            endpoint_url: input.endpoint_url.clone(),
            http_method: input
                .http_method
                .as_deref()
                .map(str::to_ascii_uppercase)
                .unwrap_or_else(|| "POST".to_string()),
            headers: input.headers.clone().unwrap_or_else(empty_object),
            payload_template: input.payload_template.clone().unwrap_or_else(empty_object),
            is_active: input.is_active.unwrap_or(true),
            retry_count: input.retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            timeout_seconds: input.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            created_at: now,
            updated_at: now,
        };
        tables.hooks.push(hook.clone());
        Ok(hook)
    }

    async fn find_hook(&self, id: DbId) -> Result<Option<Hook>, StoreError> {
        self.check_read()?;
        Ok(self.lock().hooks.iter().find(|h| h.id == id).cloned())
    }

    async fn list_hooks(&self) -> Result<Vec<Hook>, StoreError> {
        self.check_read()?;
        let mut hooks = self.lock().hooks.clone();
        hooks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(hooks)
    }

    async fn list_active_for_event(&self, event_type: &str) -> Result<Vec<Hook>, StoreError> {
        self.check_read()?;
        Ok(self
            .lock()
            .hooks
            .iter()
            .filter(|h| h.is_active && h.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn update_hook(&self, id: DbId, input: &UpdateHook) -> Result<Option<Hook>, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        let Some(hook) = tables.hooks.iter_mut().find(|h| h.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &input.name {
            hook.name = name.trim().to_string();
        }
        if let Some(event_type) = &input.event_type {
            hook.event_type = event_type.clone();
        }
        if let Some(url) = &input.endpoint_url {
            hook.endpoint_url = url.clone();
        }
        if let Some(method) = &input.http_method {
            hook.http_method = method.to_ascii_uppercase();
        }
        if let Some(headers) = &input.headers {
            hook.headers = headers.clone();
        }
        if let Some(template) = &input.payload_template {
            hook.payload_template = template.clone();
        }
        if let Some(is_active) = input.is_active {
            hook.is_active = is_active;
        }
        if let Some(retry_count) = input.retry_count {
            hook.retry_count = retry_count;
        }
        if let Some(timeout) = input.timeout_seconds {
            hook.timeout_seconds = timeout;
        }
        hook.updated_at = Utc::now();
        Ok(Some(hook.clone()))
    }

    async fn delete_hook(&self, id: DbId) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        let before = tables.hooks.len();
        tables.hooks.retain(|h| h.id != id);
        if tables.hooks.len() == before {
            return Ok(false);
        }
        tables.executions.retain(|e| e.hook_id != id);
        tables.retries.retain(|r| r.hook_id != id);
        Ok(true)
    }

    async fn set_hook_active(&self, id: DbId, is_active: bool) -> Result<Option<Hook>, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        Ok(tables.hooks.iter_mut().find(|h| h.id == id).map(|hook| {
            hook.is_active = is_active;
            hook.updated_at = Utc::now();
            hook.clone()
        }))
    }

    // -- execution records --------------------------------------------------

    async fn create_execution(
        &self,
        input: &CreateHookExecution,
    ) -> Result<HookExecution, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        let execution = HookExecution {
            id: tables.next_id(),
            hook_id: input.hook_id,
            event_type: input.event_type.clone(),
            event_data: input.event_data.clone(),
            status: ExecutionStatus::Pending.as_str().to_string(),
            response_status: None,
            response_body: None,
            error_message: None,
            execution_time_ms: None,
            retry_attempt: input.retry_attempt,
            executed_at: Utc::now(),
            completed_at: None,
        };
        tables.executions.push(execution.clone());
        Ok(execution)
    }

    async fn complete_execution(
        &self,
        id: DbId,
        outcome: &ExecutionOutcome,
    ) -> Result<Option<HookExecution>, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        let pending = ExecutionStatus::Pending.as_str();
        Ok(tables
            .executions
            .iter_mut()
            .find(|e| e.id == id && e.status == pending)
            .map(|execution| {
                execution.status = outcome.status.as_str().to_string();
                execution.response_status = outcome.response_status;
                execution.response_body = outcome.response_body.clone();
                execution.error_message = outcome.error_message.clone();
                execution.execution_time_ms = Some(outcome.execution_time_ms);
                execution.completed_at = Some(Utc::now());
                execution.clone()
            }))
    }

    async fn list_executions(
        &self,
        hook_id: DbId,
        limit: i64,
    ) -> Result<Vec<HookExecution>, StoreError> {
        self.check_read()?;
        let mut executions: Vec<HookExecution> = self
            .lock()
            .executions
            .iter()
            .filter(|e| e.hook_id == hook_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.executed_at.cmp(&a.executed_at).then(b.id.cmp(&a.id)));
        executions.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(executions)
    }

    // -- retry queue --------------------------------------------------------

    async fn schedule_retry(&self, input: &CreateHookRetry) -> Result<HookRetry, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        let retry = HookRetry {
            id: tables.next_id(),
            hook_id: input.hook_id,
            origin_execution_id: input.origin_execution_id,
            event_type: input.event_type.clone(),
            event_data: input.event_data.clone(),
            retry_attempt: input.retry_attempt,
            due_at: input.due_at,
            claimed_at: None,
            lease_expires_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };

        if let Some(origin_id) = input.origin_execution_id {
            let failed = ExecutionStatus::Failed.as_str();
            if let Some(origin) = tables
                .executions
                .iter_mut()
                .find(|e| e.id == origin_id && e.status == failed)
            {
                origin.status = ExecutionStatus::Retrying.as_str().to_string();
                origin.retry_attempt = input.retry_attempt;
            }
        }

        tables.retries.push(retry.clone());
        Ok(retry)
    }

    async fn claim_due_retries(
        &self,
        limit: i64,
        grace: Duration,
    ) -> Result<Vec<HookRetry>, StoreError> {
        self.check_write()?;
        let now = Utc::now();
        let mut tables = self.lock();

        let mut due: Vec<usize> = tables
            .retries
            .iter()
            .enumerate()
            .filter(|(_, r)| r.completed_at.is_none() && r.claimed_at.is_none() && r.due_at <= now)
            .map(|(i, _)| i)
            .collect();
        due.sort_by_key(|&i| tables.retries[i].due_at);
        due.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));

        let mut claimed = Vec::with_capacity(due.len());
        for i in due {
            let hook_timeout = tables
                .hooks
                .iter()
                .find(|h| h.id == tables.retries[i].hook_id)
                .map(|h| Duration::from_secs(h.timeout_seconds.max(0) as u64))
                .unwrap_or_default();
            let retry = &mut tables.retries[i];
            retry.claimed_at = Some(now);
            retry.lease_expires_at = Some(lease_deadline(now, hook_timeout + grace));
            claimed.push(retry.clone());
        }
        Ok(claimed)
    }

    async fn complete_retry(&self, claim: &HookRetry) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut tables = self.lock();
        match tables.retries.iter_mut().find(|r| {
            r.id == claim.id && r.completed_at.is_none() && r.claimed_at == claim.claimed_at
        }) {
            Some(retry) => {
                retry.completed_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn release_stale_claims(&self) -> Result<u64, StoreError> {
        self.check_write()?;
        let now = Utc::now();
        let mut tables = self.lock();
        let mut released = 0;
        for retry in tables.retries.iter_mut() {
            let expired = retry.claimed_at.is_some()
                && retry.lease_expires_at.is_some_and(|deadline| deadline < now);
            if retry.completed_at.is_none() && expired {
                retry.claimed_at = None;
                retry.lease_expires_at = None;
                released += 1;
            }
        }
        Ok(released)
    }
}

fn lease_deadline(now: DateTime<Utc>, lease: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lease)
        .ok()
        .and_then(|lease| now.checked_add_signed(lease))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
