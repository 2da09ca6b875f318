// HTTP surface of the service.
// - `routes.rs` holds the handlers.
// - `api_error.rs` maps failures onto `{"error": ...}` responses.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::core::session::SessionStarter;

#[path = "api_error.rs"]
pub mod api_error;

#[path = "routes.rs"]
pub mod routes;

/// Build the router. `sessions` is shared by every request.
pub fn router<S: SessionStarter + 'static>(sessions: Arc<S>) -> Router {
    Router::new()
        .route("/", get(routes::health))
        .route("/start_gap_target", post(routes::start_gap_target::<S>))
        .with_state(sessions)
}
