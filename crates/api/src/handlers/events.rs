//! Handlers for the event taxonomy and event ingest.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use cms_core::event_types::{validate_event_type, KNOWN_EVENT_TYPES};
use cms_events::PlatformEvent;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /events`.
#[derive(Debug, Deserialize)]
pub struct PublishEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub event_data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct PublishEventResponse {
    pub event_type: String,
    /// Bus subscribers that received the event.
    pub subscribers: usize,
}

// ---------------------------------------------------------------------------
// GET /event-types
// ---------------------------------------------------------------------------

pub async fn list_event_types() -> impl IntoResponse {
    Json(DataResponse {
        data: KNOWN_EVENT_TYPES,
    })
}

// ---------------------------------------------------------------------------
// POST /events
// ---------------------------------------------------------------------------

/// Publish an event on the bus and return at once.
///
/// Dispatch to hooks happens in the background; the response never waits
/// for, or reports on, delivery.
pub async fn publish_event(
    State(state): State<AppState>,
    Json(body): Json<PublishEventRequest>,
) -> AppResult<impl IntoResponse> {
    validate_event_type(&body.event_type)?;

    let data = body
        .event_data
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    if !data.is_object() {
        return Err(AppError::BadRequest(
            "event_data must be a JSON object".to_string(),
        ));
    }

    let subscribers = state
        .event_bus
        .publish(PlatformEvent::new(body.event_type.clone(), data));
    tracing::debug!(event_type = %body.event_type, subscribers, "Event published");

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: PublishEventResponse {
                event_type: body.event_type,
                subscribers,
            },
        }),
    ))
}
