//! ```text
//! GET    /event-types   list_event_types
//! POST   /events        publish_event
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/event-types", get(events::list_event_types))
        .route("/events", post(events::publish_event))
}
