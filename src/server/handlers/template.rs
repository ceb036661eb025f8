//! Template upload and display-size reporting.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;

use crate::template::{DisplaySize, LoadOutcome, decode_template};

use super::super::state::AppState;
use super::{ApiError, api_error, lookup};

/// Response from upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub natural_width: u32,
    pub natural_height: u32,
    /// False if a newer upload for the same session finished first.
    pub applied: bool,
}

/// POST /api/sessions/:id/template - Upload the blank form image.
///
/// The session is not locked while decoding, so a second upload can start
/// meanwhile; whichever upload started last wins.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (session, _) = lookup(&state, &id).await?;

    let mut image_data: Option<Vec<u8>> = None;
    let mut filename = String::from("unknown");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("image") {
            filename = field.file_name().unwrap_or("unknown").to_string();
            let bytes = field.bytes().await.map_err(|e| {
                api_error(StatusCode::BAD_REQUEST, format!("Failed to read image: {}", e))
            })?;
            image_data = Some(bytes.to_vec());
            break;
        }
    }

    let image_bytes =
        image_data.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No image field found"))?;

    let ticket = session.lock().await.begin_template_load();
    let decoded = decode_template(image_bytes).await;
    let (natural_width, natural_height) = decoded
        .as_ref()
        .map(|t| (t.natural_width(), t.natural_height()))
        .unwrap_or((0, 0));

    let outcome = session.lock().await.complete_template_load(ticket, decoded)?;
    if outcome == LoadOutcome::Superseded {
        tracing::info!("[template] upload {} superseded by a newer one", filename);
    }

    Ok(Json(UploadResponse {
        filename,
        natural_width,
        natural_height,
        applied: outcome == LoadOutcome::Applied,
    }))
}

/// GET /api/sessions/:id/template - The uploaded template, for display.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    let session = session.lock().await;
    let template = session
        .template()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No template loaded"))?;

    Ok((
        [(header::CONTENT_TYPE, template.mime_type())],
        template.source_bytes().to_vec(),
    ))
}

/// PUT /api/sessions/:id/display - Report the size the template is shown at.
pub async fn report_display(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(size): Json<DisplaySize>,
) -> Result<StatusCode, ApiError> {
    if !size.is_valid() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Display width and height must be positive",
        ));
    }
    let (_, display) = lookup(&state, &id).await?;
    display.report(size);
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/sessions/:id/display - The template is no longer on screen.
pub async fn unmount_display(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let (_, display) = lookup(&state, &id).await?;
    display.unmount();
    Ok(StatusCode::NO_CONTENT)
}
