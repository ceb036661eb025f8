//! Field data handlers: direct upload and extraction from a document.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use crate::element::TextElement;
use crate::extract::ExtractRequest;
use crate::fields::FieldMap;

use super::super::state::AppState;
use super::{ApiError, api_error, lookup};

/// POST /api/sessions/:id/fields - Replace the elements with one per field.
///
/// An empty body (or `{}`) loads the demo data.
pub async fn load(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Vec<TextElement>>, ApiError> {
    let fields: FieldMap = if body.iter().all(u8::is_ascii_whitespace) {
        FieldMap::new()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Invalid field data: {}", e)))?
    };
    let fields = if fields.is_empty() {
        tracing::info!("[fields] no field data supplied, loading sample data");
        FieldMap::sample()
    } else {
        fields
    };

    let (session, _) = lookup(&state, &id).await?;
    let mut session = session.lock().await;
    Ok(Json(session.load_fields(&fields).to_vec()))
}

/// POST /api/sessions/:id/extract - Send a document to the extraction
/// service and load the fields it returns.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(request): Query<ExtractRequest>,
    mut multipart: Multipart,
) -> Result<Json<Vec<TextElement>>, ApiError> {
    let extractor = state.extractor.clone().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "No extraction service configured",
        )
    })?;
    let (session, _) = lookup(&state, &id).await?;

    let mut document: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("document").to_string();
            let bytes = field.bytes().await.map_err(|e| {
                api_error(StatusCode::BAD_REQUEST, format!("Failed to read document: {}", e))
            })?;
            document = Some((bytes.to_vec(), filename));
            break;
        }
    }
    let (bytes, filename) =
        document.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No file field found"))?;

    let fields = extractor.extract(bytes, &filename, &request).await?;

    let mut session = session.lock().await;
    Ok(Json(session.load_fields(&fields).to_vec()))
}
