//! Element editing and drag handlers.
//!
//! Updates addressing an element that no longer exists succeed without
//! effect: a browser may finish a drag after the batch was replaced.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::element::{ElementId, StyleUpdate, TextElement};
use crate::session::OverlaySession;
use crate::transform::DisplayPoint;

use super::super::state::AppState;
use super::{ApiError, lookup};

/// Pointer event sent by the browser.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    Cancel,
}

/// Drag state after a pointer event.
#[derive(Debug, Serialize)]
pub struct DragResponse {
    /// Element being dragged (or just released).
    pub element: Option<ElementId>,
    /// Its live or committed position.
    pub position: Option<DisplayPoint>,
    pub dragging: bool,
}

/// GET /api/sessions/:id/elements - Elements in stacking order.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TextElement>>, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(session.elements().to_vec()))
}

/// PUT /api/sessions/:id/elements/:element_id/position
pub async fn position(
    State(state): State<Arc<AppState>>,
    Path((id, element_id)): Path<(String, u64)>,
    Json(point): Json<DisplayPoint>,
) -> Result<StatusCode, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    session
        .lock()
        .await
        .update_position(ElementId(element_id), point);
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/sessions/:id/elements/:element_id/style
pub async fn style(
    State(state): State<Arc<AppState>>,
    Path((id, element_id)): Path<(String, u64)>,
    Json(update): Json<StyleUpdate>,
) -> Result<StatusCode, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    session.lock().await.update_style(ElementId(element_id), update);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/elements/:element_id/front
pub async fn bring_to_front(
    State(state): State<Arc<AppState>>,
    Path((id, element_id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    session.lock().await.bring_to_front(ElementId(element_id));
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/elements/:element_id/back
pub async fn send_to_back(
    State(state): State<Arc<AppState>>,
    Path((id, element_id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    session.lock().await.send_to_back(ElementId(element_id));
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/sessions/:id/elements/:element_id
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path((id, element_id)): Path<(String, u64)>,
) -> Result<StatusCode, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    session.lock().await.remove_element(ElementId(element_id));
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/drag - Feed one pointer event to the drag controller.
pub async fn drag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(event): Json<PointerEvent>,
) -> Result<Json<DragResponse>, ApiError> {
    let (session, _) = lookup(&state, &id).await?;
    let mut session = session.lock().await;

    let response = match event {
        PointerEvent::Down { x, y } => {
            let element = session.pointer_down(DisplayPoint::new(x, y));
            DragResponse {
                element,
                position: element.and_then(|el| session.preview_position(el)),
                dragging: element.is_some(),
            }
        }
        PointerEvent::Move { x, y } => {
            session.pointer_move(DisplayPoint::new(x, y));
            dragging_response(&session)
        }
        PointerEvent::Up => {
            let commit = session.pointer_up();
            DragResponse {
                element: commit.map(|c| c.id),
                position: commit.map(|c| c.position),
                dragging: false,
            }
        }
        PointerEvent::Cancel => {
            session.cancel_drag();
            DragResponse {
                element: None,
                position: None,
                dragging: false,
            }
        }
    };

    Ok(Json(response))
}

fn dragging_response(session: &OverlaySession) -> DragResponse {
    match session.dragging() {
        Some(id) => DragResponse {
            element: Some(id),
            position: session.preview_position(id),
            dragging: true,
        },
        None => DragResponse {
            element: None,
            position: None,
            dragging: false,
        },
    }
}
