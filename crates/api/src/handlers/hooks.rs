//! Handlers for hook administration.
//!
//! CRUD over hooks, the active toggle, a test fire and the execution history.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use cms_core::error::CoreError;
use cms_core::types::DbId;
use cms_db::models::hook::{CreateHook, Hook, UpdateHook};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `PATCH /hooks/{id}/toggle`.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub is_active: bool,
}

/// Request body for `POST /hooks/{id}/test`.
#[derive(Debug, Default, Deserialize)]
pub struct TestHookRequest {
    /// Sample event data; defaults to an empty object.
    #[serde(default)]
    pub event_data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_hook_exists(state: &AppState, id: DbId) -> AppResult<Hook> {
    state
        .registry
        .get(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Hook", id }))
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Hook", id })
}

// ---------------------------------------------------------------------------
// POST /hooks
// ---------------------------------------------------------------------------

pub async fn create_hook(
    State(state): State<AppState>,
    Json(body): Json<CreateHook>,
) -> AppResult<impl IntoResponse> {
    let hook = state.registry.create(&body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: hook })))
}

// ---------------------------------------------------------------------------
// GET /hooks
// ---------------------------------------------------------------------------

/// List all hooks, newest first.
pub async fn list_hooks(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let hooks = state.registry.list().await?;
    tracing::debug!(count = hooks.len(), "Listed hooks");
    Ok(Json(DataResponse { data: hooks }))
}

// ---------------------------------------------------------------------------
// GET /hooks/{id}
// ---------------------------------------------------------------------------

pub async fn get_hook(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let hook = ensure_hook_exists(&state, id).await?;
    Ok(Json(DataResponse { data: hook }))
}

// ---------------------------------------------------------------------------
// PUT /hooks/{id}
// ---------------------------------------------------------------------------

/// Partially update a hook; omitted fields keep their values.
pub async fn update_hook(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<UpdateHook>,
) -> AppResult<impl IntoResponse> {
    let hook = state
        .registry
        .update(id, &body)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: hook }))
}

// ---------------------------------------------------------------------------
// DELETE /hooks/{id}
// ---------------------------------------------------------------------------

pub async fn delete_hook(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if state.registry.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

// ---------------------------------------------------------------------------
// PATCH /hooks/{id}/toggle
// ---------------------------------------------------------------------------

pub async fn toggle_hook(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<ToggleRequest>,
) -> AppResult<impl IntoResponse> {
    let hook = state
        .registry
        .set_active(id, body.is_active)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: hook }))
}

// ---------------------------------------------------------------------------
// POST /hooks/{id}/test
// ---------------------------------------------------------------------------

/// Fire the hook once with sample data and return the recorded execution.
///
/// Runs even for inactive hooks and never queues a retry.
pub async fn test_hook(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<TestHookRequest>,
) -> AppResult<impl IntoResponse> {
    let hook = ensure_hook_exists(&state, id).await?;
    let event_data = body
        .event_data
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

    let execution = state.dispatcher.test_hook(&hook, &event_data).await?;

    tracing::info!(
        hook_id = id,
        execution_id = execution.id,
        status = %execution.status,
        "Hook tested"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: execution })))
}

// ---------------------------------------------------------------------------
// GET /hooks/{id}/executions
// ---------------------------------------------------------------------------

/// The most recent executions of a hook, newest first.
pub async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_hook_exists(&state, id).await?;
    let executions = state.registry.get_executions(id).await?;
    Ok(Json(DataResponse { data: executions }))
}
