//! HTTP handlers for the server.

pub mod elements;
pub mod export;
pub mod fields;
pub mod sessions;
pub mod template;

use axum::{Json, http::StatusCode};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::OverlayError;
use crate::session::OverlaySession;
use crate::template::ReportedDisplay;

use super::state::AppState;

/// Error body shared by all JSON endpoints.
pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({"success": false, "error": message.into()})),
    )
}

impl From<OverlayError> for ApiError {
    fn from(e: OverlayError) -> Self {
        let status = match &e {
            OverlayError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            OverlayError::NoTemplate | OverlayError::DisplayMetricsUnavailable => StatusCode::CONFLICT,
            OverlayError::UnknownElement(_) => StatusCode::NOT_FOUND,
            OverlayError::Extraction(_) => StatusCode::BAD_GATEWAY,
            OverlayError::Config(_) => StatusCode::BAD_REQUEST,
            OverlayError::Image(_)
            | OverlayError::Font(_)
            | OverlayError::Transport(_)
            | OverlayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, e.to_string())
    }
}

/// Parse a session id and fetch the session.
async fn lookup(
    state: &AppState,
    id: &str,
) -> Result<(Arc<Mutex<OverlaySession>>, ReportedDisplay), ApiError> {
    let session_id =
        Uuid::parse_str(id).map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid session ID"))?;
    state
        .session(session_id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Session not found or expired"))
}
