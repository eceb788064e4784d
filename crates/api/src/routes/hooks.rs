//! Route definitions for hook administration.
//!
//! ```text
//! POST   /                  create_hook
//! GET    /                  list_hooks
//! GET    /{id}              get_hook
//! PUT    /{id}              update_hook
//! DELETE /{id}              delete_hook
//! PATCH  /{id}/toggle       toggle_hook
//! POST   /{id}/test         test_hook
//! GET    /{id}/executions   list_executions
//! ```

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::hooks;
use crate::state::AppState;

/// Hook routes, mounted at `/hooks`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(hooks::create_hook).get(hooks::list_hooks))
        .route(
            "/{id}",
            get(hooks::get_hook)
                .put(hooks::update_hook)
                .delete(hooks::delete_hook),
        )
        .route("/{id}/toggle", patch(hooks::toggle_hook))
        .route("/{id}/test", post(hooks::test_hook))
        .route("/{id}/executions", get(hooks::list_executions))
}
