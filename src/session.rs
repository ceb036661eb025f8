//! # Overlay Session
//!
//! One editing session: a template, the elements placed on it, and the
//! drag in progress. All state changes go through this type, which keeps
//! the lifecycle rules in one place:
//!
//! - a new template replaces the old one and discards every element
//! - a new field batch discards the previous batch
//! - updates to elements that no longer exist are ignored
//!
//! ```
//! use std::sync::Arc;
//! use formfill::{config::OverlayConfig, fields::FieldMap, render::font::FontBook};
//! use formfill::session::OverlaySession;
//! use formfill::template::{DisplaySize, FixedMeasurement};
//!
//! let mut session = OverlaySession::new(
//!     OverlayConfig::default(),
//!     Arc::new(FontBook::builtin()),
//!     FixedMeasurement::new(DisplaySize::new(800.0, 533.0)),
//! );
//! let elements = session.load_fields(&FieldMap::sample());
//! assert_eq!(elements.len(), 3);
//! ```

use image::RgbaImage;
use std::sync::Arc;

use crate::config::OverlayConfig;
use crate::drag::{DragCommit, DragController};
use crate::element::{ElementId, ElementStore, StyleUpdate, TextElement};
use crate::error::{OverlayError, Result};
use crate::fields::FieldMap;
use crate::render::compositor::{self, Compositor};
use crate::render::font::FontBook;
use crate::template::{
    DisplaySize, LoadOutcome, LoadTicket, MeasurementProvider, TemplateImage, TemplateSource,
    decode_template,
};
use crate::transform::DisplayPoint;

pub struct OverlaySession {
    config: OverlayConfig,
    template: TemplateSource,
    elements: ElementStore,
    drag: DragController,
    fonts: Arc<FontBook>,
}

impl OverlaySession {
    pub fn new(
        config: OverlayConfig,
        fonts: Arc<FontBook>,
        measurement: impl MeasurementProvider + 'static,
    ) -> Self {
        Self {
            config,
            template: TemplateSource::new(measurement),
            elements: ElementStore::new(),
            drag: DragController::new(),
            fonts,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn template(&self) -> Option<&TemplateImage> {
        self.template.current()
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.template.display_size()
    }

    pub fn elements(&self) -> &[TextElement] {
        self.elements.elements()
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    // ===== Template =====

    /// Decode and install a template, starting a fresh session.
    pub async fn load_template(&mut self, bytes: Vec<u8>) -> Result<LoadOutcome> {
        let ticket = self.begin_template_load();
        let decoded = decode_template(bytes).await;
        self.complete_template_load(ticket, decoded)
    }

    /// First half of a load whose decode happens elsewhere (e.g. without
    /// holding a lock on the session). Display sizes reported before this
    /// call are discarded.
    pub fn begin_template_load(&mut self) -> LoadTicket {
        self.template.begin_load()
    }

    /// Second half of a load. Applying a template clears all elements and any
    /// drag in progress; a superseded or failed load changes nothing.
    pub fn complete_template_load(
        &mut self,
        ticket: LoadTicket,
        decoded: Result<TemplateImage>,
    ) -> Result<LoadOutcome> {
        let outcome = self.template.complete_load(ticket, decoded)?;
        if outcome == LoadOutcome::Applied {
            self.elements.clear();
            self.drag.cancel();
        }
        Ok(outcome)
    }

    // ===== Elements =====

    /// Replace all elements with one per field.
    pub fn load_fields(&mut self, fields: &FieldMap) -> &[TextElement] {
        self.elements.load_fields(fields, &self.config.layout)
    }

    /// Move an element, clamped to the current display bounds. Unknown ids
    /// are ignored.
    pub fn update_position(&mut self, id: ElementId, point: DisplayPoint) {
        let bounds = self.template.display_size();
        self.elements.update_position(id, point, bounds);
    }

    /// Apply a style edit. Unknown ids are ignored.
    pub fn update_style(&mut self, id: ElementId, update: StyleUpdate) {
        self.elements.update_style(id, update);
    }

    pub fn remove_element(&mut self, id: ElementId) -> bool {
        self.elements.remove(id)
    }

    pub fn bring_to_front(&mut self, id: ElementId) {
        self.elements.bring_to_front(id);
    }

    pub fn send_to_back(&mut self, id: ElementId) {
        self.elements.send_to_back(id);
    }

    // ===== Dragging =====

    pub fn pointer_down(&mut self, pointer: DisplayPoint) -> Option<ElementId> {
        self.drag.pointer_down(pointer, &self.elements, self.fonts.as_ref())
    }

    pub fn pointer_move(&mut self, pointer: DisplayPoint) {
        let bounds = self.template.display_size();
        self.drag.pointer_move(pointer, bounds);
    }

    pub fn pointer_up(&mut self) -> Option<DragCommit> {
        let bounds = self.template.display_size();
        self.drag.pointer_up(&mut self.elements, bounds)
    }

    pub fn dragging(&self) -> Option<ElementId> {
        self.drag.dragged()
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Where `id` should be drawn in the live preview.
    pub fn preview_position(&self, id: ElementId) -> Option<DisplayPoint> {
        self.drag
            .live_position(id)
            .or_else(|| self.elements.get(id).map(TextElement::position))
    }

    // ===== Export =====

    /// Composite synchronously.
    pub fn render(&self) -> Result<RgbaImage> {
        Compositor::new(&self.fonts).render(&self.template, self.elements.elements())
    }

    /// Capture everything an export needs, measuring the display now.
    pub fn snapshot(&self) -> Result<ExportJob> {
        let template = self.template.current().ok_or(OverlayError::NoTemplate)?;
        let display = self
            .template
            .display_size()
            .ok_or(OverlayError::DisplayMetricsUnavailable)?;
        Ok(ExportJob {
            template: template.clone(),
            display,
            elements: self.elements.elements().to_vec(),
            fonts: Arc::clone(&self.fonts),
        })
    }

    /// Render and encode to PNG on the blocking pool.
    pub async fn export_png(&self) -> Result<Vec<u8>> {
        self.snapshot()?.run_async().await
    }
}

/// A self-contained export: template, measurement and elements as they were
/// when the export was requested.
pub struct ExportJob {
    template: TemplateImage,
    display: DisplaySize,
    elements: Vec<TextElement>,
    fonts: Arc<FontBook>,
}

impl ExportJob {
    /// Render and encode. CPU-bound.
    pub fn run(&self) -> Result<Vec<u8>> {
        let image = Compositor::new(&self.fonts).render_parts(
            Some(&self.template),
            Some(self.display),
            &self.elements,
        )?;
        let png = compositor::encode_png(&image)?;
        tracing::info!(
            "exported {}x{} PNG with {} element(s), {} bytes",
            image.width(),
            image.height(),
            self.elements.len(),
            png.len()
        );
        Ok(png)
    }

    pub async fn run_async(self) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || self.run())
            .await
            .map_err(|e| OverlayError::Image(format!("Export task failed: {}", e)))?
    }
}
