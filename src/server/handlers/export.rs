//! Export handler.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

use super::super::state::AppState;
use super::{ApiError, lookup};

/// GET /api/sessions/:id/export - Flattened PNG at the template's native size.
///
/// The display size is measured when the request arrives; rendering and
/// encoding then run on the blocking pool without holding the session.
pub async fn export(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    let (job, filename) = {
        let session = session.lock().await;
        (session.snapshot()?, session.config().output_filename.clone())
    };

    let png_bytes = job.run_async().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "")),
            ),
        ],
        png_bytes,
    ))
}
