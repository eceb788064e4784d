//! Hook registry: validated CRUD over a [`HookStore`].
//!
//! Input is checked against the `cms-core` rules before the store is
//! touched, so a rejected request never reaches persistence.

use std::sync::Arc;

use cms_core::error::CoreError;
use cms_core::event_types::validate_event_type;
use cms_core::execution::EXECUTION_HISTORY_LIMIT;
use cms_core::hooks::{
    validate_endpoint_url, validate_headers, validate_hook_name, validate_retry_count,
    validate_timeout_seconds, HttpMethod,
};
use cms_core::types::DbId;
use cms_db::models::hook::{CreateHook, Hook, UpdateHook};
use cms_db::models::hook_execution::HookExecution;

use crate::store::{HookStore, StoreError};

/// Failure of a registry operation.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared handle to the hook registry. Cheap to clone.
pub struct HookRegistry<S> {
    store: Arc<S>,
}

impl<S> Clone for HookRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: HookStore> HookRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate and insert a new hook.
    pub async fn create(&self, input: &CreateHook) -> Result<Hook, RegistryError> {
        validate_create(input)?;
        let hook = self.store.create_hook(input).await?;
        tracing::info!(
            hook_id = hook.id,
            event_type = %hook.event_type,
            "Hook created"
        );
        Ok(hook)
    }

    /// All hooks, newest first.
    pub async fn list(&self) -> Result<Vec<Hook>, StoreError> {
        self.store.list_hooks().await
    }

    pub async fn list_active_for_event(&self, event_type: &str) -> Result<Vec<Hook>, StoreError> {
        self.store.list_active_for_event(event_type).await
    }

    /// The most recent execution records for a hook, newest first.
    pub async fn get_executions(&self, hook_id: DbId) -> Result<Vec<HookExecution>, StoreError> {
        self.store
            .list_executions(hook_id, EXECUTION_HISTORY_LIMIT)
            .await
    }

    pub async fn get(&self, id: DbId) -> Result<Option<Hook>, StoreError> {
        self.store.find_hook(id).await
    }

    /// Validate the supplied fields and apply them. `None` if the hook is gone.
    pub async fn update(&self, id: DbId, input: &UpdateHook) -> Result<Option<Hook>, RegistryError> {
        validate_update(input)?;
        let hook = self.store.update_hook(id, input).await?;
        if hook.is_some() {
            tracing::info!(hook_id = id, "Hook updated");
        }
        Ok(hook)
    }

    /// Delete a hook and its history. `false` if it did not exist.
    pub async fn delete(&self, id: DbId) -> Result<bool, StoreError> {
        let deleted = self.store.delete_hook(id).await?;
        if deleted {
            tracing::info!(hook_id = id, "Hook deleted");
        }
        Ok(deleted)
    }

    pub async fn set_active(&self, id: DbId, is_active: bool) -> Result<Option<Hook>, StoreError> {
        let hook = self.store.set_hook_active(id, is_active).await?;
        if hook.is_some() {
            tracing::info!(hook_id = id, is_active, "Hook toggled");
        }
        Ok(hook)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_create(input: &CreateHook) -> Result<(), CoreError> {
    validate_hook_name(&input.name)?;
    validate_event_type(&input.event_type)?;
    validate_optional_fields(
        input.endpoint_url.as_deref(),
        input.http_method.as_deref(),
        input.headers.as_ref(),
        input.retry_count,
        input.timeout_seconds,
    )
}

fn validate_update(input: &UpdateHook) -> Result<(), CoreError> {
    if let Some(name) = &input.name {
        validate_hook_name(name)?;
    }
    if let Some(event_type) = &input.event_type {
        validate_event_type(event_type)?;
    }
    validate_optional_fields(
        input.new_endpoint_url(),
        input.http_method.as_deref(),
        input.headers.as_ref(),
        input.retry_count,
        input.timeout_seconds,
    )
}

fn validate_optional_fields(
    endpoint_url: Option<&str>,
    http_method: Option<&str>,
    headers: Option<&serde_json::Value>,
    retry_count: Option<i32>,
    timeout_seconds: Option<i32>,
) -> Result<(), CoreError> {
    if let Some(url) = endpoint_url {
        validate_endpoint_url(url)?;
    }
    if let Some(method) = http_method {
        HttpMethod::from_str(method)?;
    }
    if let Some(headers) = headers {
        validate_headers(headers)?;
    }
    if let Some(retry_count) = retry_count {
        validate_retry_count(retry_count)?;
    }
    if let Some(timeout) = timeout_seconds {
        validate_timeout_seconds(timeout)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_name_and_event_type() {
        let input = CreateHook {
            name: " ".to_string(),
            event_type: "content.published".to_string(),
            ..Default::default()
        };
        assert!(validate_create(&input).is_err());

        let input = CreateHook {
            name: "Notifier".to_string(),
            event_type: "content published".to_string(),
            ..Default::default()
        };
        assert!(validate_create(&input).is_err());
    }

    #[test]
    fn create_without_endpoint_is_valid() {
        let input = CreateHook {
            name: "Placeholder".to_string(),
            event_type: "media.uploaded".to_string(),
            ..Default::default()
        };
        assert!(validate_create(&input).is_ok());
    }

    #[test]
    fn update_checks_only_supplied_fields() {
        assert!(validate_update(&UpdateHook::default()).is_ok());

        let bad_method = UpdateHook {
            http_method: Some("TRACE".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&bad_method).is_err());

        let bad_timeout = UpdateHook {
            timeout_seconds: Some(0),
            ..Default::default()
        };
        assert!(validate_update(&bad_timeout).is_err());
    }
}
