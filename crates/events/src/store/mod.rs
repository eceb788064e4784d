//! Persistence seam for the dispatch engine.
//!
//! [`HookStore`] is everything the registry, dispatcher and retry scheduler
//! need from storage. [`PgHookStore`] backs it with PostgreSQL through the
//! `cms-db` repositories; [`MemoryHookStore`] keeps it in process for tests
//! and embedded use.

use std::future::Future;
use std::time::Duration;

use cms_core::types::DbId;
use cms_db::models::hook::{CreateHook, Hook, UpdateHook};
use cms_db::models::hook_execution::{CreateHookExecution, ExecutionOutcome, HookExecution};
use cms_db::models::hook_retry::{CreateHookRetry, HookRetry};

pub mod memory;
pub mod postgres;

pub use memory::MemoryHookStore;
pub use postgres::PgHookStore;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// A persistence failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The PostgreSQL backend rejected the operation.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A non-SQL backend could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// HookStore
// ---------------------------------------------------------------------------

/// Storage operations for hooks, execution records and the retry queue.
///
/// Implementations must tolerate concurrent calls; the dispatcher fans out
/// across hooks and writes execution records from several tasks at once.
pub trait HookStore: Send + Sync {
    // -- hooks --------------------------------------------------------------

    fn create_hook(
        &self,
        input: &CreateHook,
    ) -> impl Future<Output = Result<Hook, StoreError>> + Send;

    fn find_hook(&self, id: DbId) -> impl Future<Output = Result<Option<Hook>, StoreError>> + Send;

    /// All hooks, newest first.
    fn list_hooks(&self) -> impl Future<Output = Result<Vec<Hook>, StoreError>> + Send;

    /// Active hooks whose `event_type` equals `event_type`.
    fn list_active_for_event(
        &self,
        event_type: &str,
    ) -> impl Future<Output = Result<Vec<Hook>, StoreError>> + Send;

    fn update_hook(
        &self,
        id: DbId,
        input: &UpdateHook,
    ) -> impl Future<Output = Result<Option<Hook>, StoreError>> + Send;

    /// Delete a hook together with its executions and queued retries.
    fn delete_hook(&self, id: DbId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn set_hook_active(
        &self,
        id: DbId,
        is_active: bool,
    ) -> impl Future<Output = Result<Option<Hook>, StoreError>> + Send;

    // -- execution records --------------------------------------------------

    /// Insert a `pending` execution record.
    fn create_execution(
        &self,
        input: &CreateHookExecution,
    ) -> impl Future<Output = Result<HookExecution, StoreError>> + Send;

    /// Write the outcome over a `pending` record. `None` if it is not pending.
    fn complete_execution(
        &self,
        id: DbId,
        outcome: &ExecutionOutcome,
    ) -> impl Future<Output = Result<Option<HookExecution>, StoreError>> + Send;

    /// Most recent `limit` records for a hook, newest first.
    fn list_executions(
        &self,
        hook_id: DbId,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<HookExecution>, StoreError>> + Send;

    // -- retry queue --------------------------------------------------------

    /// Queue a follow-up attempt and move the origin record to `retrying`,
    /// atomically.
    fn schedule_retry(
        &self,
        input: &CreateHookRetry,
    ) -> impl Future<Output = Result<HookRetry, StoreError>> + Send;

    /// Claim up to `limit` due retries so no other scheduler runs them.
    ///
    /// Each claim is leased for the hook's timeout plus `grace`.
    fn claim_due_retries(
        &self,
        limit: i64,
        grace: Duration,
    ) -> impl Future<Output = Result<Vec<HookRetry>, StoreError>> + Send;

    /// Complete `retry` if it still holds the claim it was returned with.
    fn complete_retry(
        &self,
        retry: &HookRetry,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Requeue claims whose lease expired before they completed.
    fn release_stale_claims(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
