pub mod events;
pub mod health;
pub mod hooks;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes.
///
/// ```text
/// /hooks          hook administration (see hooks::router)
/// /event-types    known event tags
/// /events         event ingest
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/hooks", hooks::router())
        .merge(events::router())
}
