//! # HTTP Server for Form Overlays
//!
//! Exposes overlay sessions to a browser front-end. The browser renders the
//! template and the draggable text; the server keeps the authoritative
//! session state and produces the export.
//!
//! ## Usage
//!
//! ```bash
//! formfill serve --listen 0.0.0.0:8080 --extractor http://localhost:8001
//! ```
//!
//! A typical session:
//!
//! 1. `POST /api/sessions` → `{"id": ...}`
//! 2. `POST /api/sessions/:id/template` (multipart `image`)
//! 3. `PUT /api/sessions/:id/display` whenever the preview is laid out or resized
//! 4. `POST /api/sessions/:id/fields` (or `/extract`)
//! 5. pointer events to `/drag`, style edits to `/elements/:eid/style`
//! 6. `GET /api/sessions/:id/export` → `filled-form.png`

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use crate::error::OverlayError;
use crate::extract::{FieldSource, HttpFieldSource};
use crate::render::font::FontBook;
use state::SESSION_EXPIRATION_SECS;

/// Upload limit for templates and documents.
const UPLOAD_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/sessions", post(handlers::sessions::create))
        .route(
            "/api/sessions/:id",
            axum::routing::delete(handlers::sessions::delete),
        )
        // Template
        .route(
            "/api/sessions/:id/template",
            post(handlers::template::upload)
                .get(handlers::template::get)
                .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route(
            "/api/sessions/:id/display",
            put(handlers::template::report_display).delete(handlers::template::unmount_display),
        )
        // Field data
        .route("/api/sessions/:id/fields", post(handlers::fields::load))
        .route(
            "/api/sessions/:id/extract",
            post(handlers::fields::extract).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        // Elements
        .route("/api/sessions/:id/elements", get(handlers::elements::list))
        .route(
            "/api/sessions/:id/elements/:element_id",
            axum::routing::delete(handlers::elements::remove),
        )
        .route(
            "/api/sessions/:id/elements/:element_id/position",
            put(handlers::elements::position),
        )
        .route(
            "/api/sessions/:id/elements/:element_id/style",
            patch(handlers::elements::style),
        )
        .route(
            "/api/sessions/:id/elements/:element_id/front",
            post(handlers::elements::bring_to_front),
        )
        .route(
            "/api/sessions/:id/elements/:element_id/back",
            post(handlers::elements::send_to_back),
        )
        .route("/api/sessions/:id/drag", post(handlers::elements::drag))
        // Export
        .route("/api/sessions/:id/export", get(handlers::export::export))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use formfill::{config::OverlayConfig, server::{serve, ServerConfig}};
///
/// # async fn example() -> Result<(), formfill::error::OverlayError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     extractor_url: None,
///     overlay: OverlayConfig::default(),
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), OverlayError> {
    let fonts = Arc::new(FontBook::from_config(&config.overlay)?);
    let extractor = match &config.extractor_url {
        Some(url) => Some(Arc::new(HttpFieldSource::new(url)?) as Arc<dyn FieldSource>),
        None => None,
    };
    let app_state = Arc::new(AppState::new(config.clone(), fonts, extractor));

    // Spawn background session cleanup task
    tokio::spawn(cleanup_sessions(app_state.clone()));

    let app = router(app_state);

    tracing::info!("formfill HTTP server starting");
    tracing::info!("Listening on: {}", config.listen_addr);
    match &config.extractor_url {
        Some(url) => tracing::info!("Field extraction service: {}", url),
        None => tracing::info!("No field extraction service configured"),
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            OverlayError::Transport(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| OverlayError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}

/// Background task to drop sessions nobody touched for an hour.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    let expiration = Duration::from_secs(SESSION_EXPIRATION_SECS);

    loop {
        interval.tick().await;
        let now = Instant::now();

        let mut sessions = state.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, v| now.duration_since(v.last_accessed) < expiration);
        let after = sessions.len();
        if before != after {
            tracing::info!(
                "[cache] Cleaned up {} expired session(s) ({} remaining)",
                before - after,
                after
            );
        }
    }
}
