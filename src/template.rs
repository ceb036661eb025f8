//! # Template Source
//!
//! Holds the blank form the fields are placed on: its original bytes, the
//! decoded pixels, the natural (asset) size, and access to the size at which
//! the embedding UI currently shows it.
//!
//! ## Display measurements
//!
//! The display size is read through a [`MeasurementProvider`] every time it is
//! needed. The UI owns the measurement (window resizes, layout shifts); the
//! core never caches it.
//!
//! ## Loading
//!
//! Decoding runs on the blocking pool and may be overtaken by a newer upload.
//! Each load takes a [`LoadTicket`]; only the newest ticket's result is
//! applied, older results are dropped. Starting a load also clears the
//! display measurement, so only sizes reported after the upload began count.
//!
//! ```
//! use formfill::template::{FixedMeasurement, LoadOutcome, TemplateSource, DisplaySize};
//!
//! # async fn example(old: Vec<u8>, new: Vec<u8>) -> formfill::error::Result<()> {
//! let mut source = TemplateSource::new(FixedMeasurement::new(DisplaySize::new(800.0, 533.0)));
//! let first = source.begin_load();
//! let second = source.begin_load();
//! let decoded_new = formfill::template::decode_template(new).await;
//! assert_eq!(source.complete_load(second, decoded_new)?, LoadOutcome::Applied);
//! let decoded_old = formfill::template::decode_template(old).await;
//! assert_eq!(source.complete_load(first, decoded_old)?, LoadOutcome::Superseded);
//! # Ok(())
//! # }
//! ```

use image::{ImageFormat, RgbaImage};
use std::sync::{Arc, RwLock};

use crate::error::{OverlayError, Result};
pub use crate::transform::DisplaySize;

/// Supplies the template's current on-screen size.
pub trait MeasurementProvider: Send + Sync {
    /// Current display size, or `None` if the template is not mounted.
    fn measure(&self) -> Option<DisplaySize>;

    /// Called when a template load starts; earlier measurements no longer apply.
    fn reset(&self) {}
}

/// A measurement that never changes. Used by the CLI and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedMeasurement(Option<DisplaySize>);

impl FixedMeasurement {
    pub fn new(size: DisplaySize) -> Self {
        Self(Some(size))
    }

    /// A template that is never shown.
    pub fn unmounted() -> Self {
        Self(None)
    }
}

impl MeasurementProvider for FixedMeasurement {
    fn measure(&self) -> Option<DisplaySize> {
        self.0.filter(DisplaySize::is_valid)
    }
}

/// Measurement reported by a remote UI. Clones share the same value.
#[derive(Debug, Clone, Default)]
pub struct ReportedDisplay {
    current: Arc<RwLock<Option<DisplaySize>>>,
}

impl ReportedDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size the UI is rendering the template at.
    pub fn report(&self, size: DisplaySize) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(size);
        }
    }

    /// The UI no longer shows the template.
    pub fn unmount(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }
}

impl MeasurementProvider for ReportedDisplay {
    fn measure(&self) -> Option<DisplaySize> {
        self.current
            .read()
            .ok()
            .and_then(|current| *current)
            .filter(DisplaySize::is_valid)
    }

    fn reset(&self) {
        self.unmount();
    }
}

/// A decoded template.
#[derive(Debug, Clone)]
pub struct TemplateImage {
    source_bytes: Arc<Vec<u8>>,
    format: ImageFormat,
    pixels: Arc<RgbaImage>,
}

impl TemplateImage {
    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// The uploaded bytes, unchanged.
    pub fn source_bytes(&self) -> &[u8] {
        &self.source_bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Decode template bytes on the blocking pool.
pub async fn decode_template(bytes: Vec<u8>) -> Result<TemplateImage> {
    tokio::task::spawn_blocking(move || decode_template_blocking(bytes))
        .await
        .map_err(|e| OverlayError::UnsupportedFormat(format!("decode task failed: {}", e)))?
}

/// Synchronous decode, for callers already off the async runtime.
pub fn decode_template_blocking(bytes: Vec<u8>) -> Result<TemplateImage> {
    let format = image::guess_format(&bytes)
        .map_err(|e| OverlayError::UnsupportedFormat(e.to_string()))?;
    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| OverlayError::UnsupportedFormat(e.to_string()))?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(OverlayError::UnsupportedFormat(
            "image has no pixels".to_string(),
        ));
    }

    tracing::debug!(
        "decoded {:?} template {}x{}",
        format,
        decoded.width(),
        decoded.height()
    );

    Ok(TemplateImage {
        source_bytes: Arc::new(bytes),
        format,
        pixels: Arc::new(decoded.to_rgba8()),
    })
}

/// Token identifying one template load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Result of completing a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The template was replaced.
    Applied,
    /// A newer load started meanwhile; this result was dropped.
    Superseded,
}

/// Owner of the current template and its display measurement.
pub struct TemplateSource {
    current: Option<TemplateImage>,
    measurement: Box<dyn MeasurementProvider>,
    generation: u64,
}

impl TemplateSource {
    pub fn new(measurement: impl MeasurementProvider + 'static) -> Self {
        Self {
            current: None,
            measurement: Box::new(measurement),
            generation: 0,
        }
    }

    /// Start a load. Any ticket handed out earlier becomes stale, and so
    /// does any display size reported before this call.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.measurement.reset();
        LoadTicket(self.generation)
    }

    /// Apply a decode result if `ticket` is still the newest load.
    ///
    /// A decode error for the newest load is returned and leaves the current
    /// template untouched. Stale results are dropped whether they succeeded
    /// or not.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        decoded: Result<TemplateImage>,
    ) -> Result<LoadOutcome> {
        if ticket.0 != self.generation {
            tracing::debug!(
                "dropping superseded template load {} (current {})",
                ticket.0,
                self.generation
            );
            return Ok(LoadOutcome::Superseded);
        }
        let image = decoded?;
        tracing::info!(
            "template loaded: {}x{} ({})",
            image.natural_width(),
            image.natural_height(),
            image.mime_type()
        );
        self.current = Some(image);
        Ok(LoadOutcome::Applied)
    }

    pub fn current(&self) -> Option<&TemplateImage> {
        self.current.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    /// Current display size, if the template is loaded and mounted.
    pub fn display_size(&self) -> Option<DisplaySize> {
        self.current.as_ref()?;
        self.measurement.measure()
    }
}
