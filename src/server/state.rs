//! Server state and configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::OverlayConfig;
use crate::extract::FieldSource;
use crate::render::font::FontBook;
use crate::session::OverlaySession;
use crate::template::ReportedDisplay;

/// Session expiration time in seconds (1 hour).
pub const SESSION_EXPIRATION_SECS: u64 = 3600;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Base URL of the field-extraction service, if any
    pub extractor_url: Option<String>,
    pub overlay: OverlayConfig,
}

/// An editing session plus the display size its browser reports.
pub struct SessionEntry {
    pub session: Arc<Mutex<OverlaySession>>,
    pub display: ReportedDisplay,
    pub last_accessed: Instant,
}

impl SessionEntry {
    pub fn new(config: OverlayConfig, fonts: Arc<FontBook>) -> Self {
        let display = ReportedDisplay::new();
        let session = OverlaySession::new(config, fonts, display.clone());
        Self {
            session: Arc::new(Mutex::new(session)),
            display,
            last_accessed: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub fonts: Arc<FontBook>,
    pub extractor: Option<Arc<dyn FieldSource>>,
    pub sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        fonts: Arc<FontBook>,
        extractor: Option<Arc<dyn FieldSource>>,
    ) -> Self {
        Self {
            config,
            fonts,
            extractor,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a session, keeping it alive. Returns the session handle and
    /// its display reporter.
    pub async fn session(&self, id: Uuid) -> Option<(Arc<Mutex<OverlaySession>>, ReportedDisplay)> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.touch();
        Some((entry.session.clone(), entry.display.clone()))
    }
}
