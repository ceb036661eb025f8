//! Session lifecycle handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::super::state::{AppState, SessionEntry};
use super::{ApiError, api_error};

/// Response from session creation.
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub id: String,
    /// Suggested filename for exports.
    pub output_filename: String,
}

/// POST /api/sessions - Start a new editing session.
pub async fn create(State(state): State<Arc<AppState>>) -> Json<CreateResponse> {
    let id = Uuid::new_v4();
    let entry = SessionEntry::new(state.config.overlay.clone(), state.fonts.clone());
    state.sessions.write().await.insert(id, entry);
    tracing::debug!("created session {}", id);

    Json(CreateResponse {
        id: id.to_string(),
        output_filename: state.config.overlay.output_filename.clone(),
    })
}

/// DELETE /api/sessions/:id - Discard a session.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id =
        Uuid::parse_str(&id).map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid session ID"))?;
    match state.sessions.write().await.remove(&session_id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(api_error(StatusCode::NOT_FOUND, "Session not found or expired")),
    }
}
