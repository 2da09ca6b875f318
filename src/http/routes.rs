use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::core::session::{SessionStarter, StartRequest};

use super::api_error::ApiError;

pub const HEALTH_MESSAGE: &str = "✅ Target GAP Analysis API is live";
pub const STARTED_MESSAGE: &str = "Target GAP analysis started";

#[derive(Debug, Serialize)]
pub struct StartedResponse {
    pub message: &'static str,
}

/// `GET /`
pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}

/// `POST /start_gap_target`
///
/// The body is parsed here rather than through the `Json` extractor so that
/// malformed JSON answers 500 `{"error": ...}` like every other failure.
pub async fn start_gap_target<S: SessionStarter + 'static>(
    State(sessions): State<Arc<S>>,
    body: Bytes,
) -> Result<Json<StartedResponse>, ApiError> {
    tracing::info!(payload = %String::from_utf8_lossy(&body), "Received start request");

    let request: StartRequest = serde_json::from_slice(&body)?;

    // The handle is dropped: the run is detached and the caller is not kept waiting.
    let handle = sessions.start(request).await?;
    drop(handle);

    Ok(Json(StartedResponse {
        message: STARTED_MESSAGE,
    }))
}
