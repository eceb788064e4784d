//! [`HookStore`] over PostgreSQL.

use std::time::Duration;

use cms_core::types::DbId;
use cms_db::models::hook::{CreateHook, Hook, UpdateHook};
use cms_db::models::hook_execution::{CreateHookExecution, ExecutionOutcome, HookExecution};
use cms_db::models::hook_retry::{CreateHookRetry, HookRetry};
use cms_db::repositories::{HookExecutionRepo, HookRepo, HookRetryRepo};
use cms_db::DbPool;

use super::{HookStore, StoreError};

/// Delegates every operation to the `cms-db` repositories.
#[derive(Clone)]
pub struct PgHookStore {
    pool: DbPool,
}

impl PgHookStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl HookStore for PgHookStore {
    async fn create_hook(&self, input: &CreateHook) -> Result<Hook, StoreError> {
        Ok(HookRepo::create(&self.pool, input).await?)
    }

    async fn find_hook(&self, id: DbId) -> Result<Option<Hook>, StoreError> {
        Ok(HookRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_hooks(&self) -> Result<Vec<Hook>, StoreError> {
        Ok(HookRepo::list(&self.pool).await?)
    }

    async fn list_active_for_event(&self, event_type: &str) -> Result<Vec<Hook>, StoreError> {
        Ok(HookRepo::list_active_for_event(&self.pool, event_type).await?)
    }

    async fn update_hook(&self, id: DbId, input: &UpdateHook) -> Result<Option<Hook>, StoreError> {
        Ok(HookRepo::update(&self.pool, id, input).await?)
    }

    async fn delete_hook(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(HookRepo::delete(&self.pool, id).await?)
    }

    async fn set_hook_active(&self, id: DbId, is_active: bool) -> Result<Option<Hook>, StoreError> {
        Ok(HookRepo::set_active(&self.pool, id, is_active).await?)
    }

    async fn create_execution(
        &self,
        input: &CreateHookExecution,
    ) -> Result<HookExecution, StoreError> {
        Ok(HookExecutionRepo::create(&self.pool, input).await?)
    }

    async fn complete_execution(
        &self,
        id: DbId,
        outcome: &ExecutionOutcome,
    ) -> Result<Option<HookExecution>, StoreError> {
        Ok(HookExecutionRepo::complete(&self.pool, id, outcome).await?)
    }

    async fn list_executions(
        &self,
        hook_id: DbId,
        limit: i64,
    ) -> Result<Vec<HookExecution>, StoreError> {
        Ok(HookExecutionRepo::list_for_hook(&self.pool, hook_id, limit).await?)
    }

    async fn schedule_retry(&self, input: &CreateHookRetry) -> Result<HookRetry, StoreError> {
        Ok(HookRetryRepo::enqueue(&self.pool, input).await?)
    }

    async fn claim_due_retries(
        &self,
        limit: i64,
        grace: Duration,
    ) -> Result<Vec<HookRetry>, StoreError> {
        Ok(HookRetryRepo::claim_due(&self.pool, limit, grace.as_secs_f64()).await?)
    }

    async fn complete_retry(&self, retry: &HookRetry) -> Result<bool, StoreError> {
        Ok(HookRetryRepo::complete(&self.pool, retry.id, retry.claimed_at).await?)
    }

    async fn release_stale_claims(&self) -> Result<u64, StoreError> {
        Ok(HookRetryRepo::release_stale_claims(&self.pool).await?)
    }
}
