//! # formfill - Form Overlay Compositing
//!
//! formfill places extracted key/value fields on top of a blank form image
//! and exports a flattened PNG at the form's native resolution. It provides:
//!
//! - **Element store**: positionable, styled text elements in display space
//! - **Coordinate transform**: display ↔ native scaling derived per export
//! - **Drag controller**: pointer gestures → bounded element moves
//! - **Compositor**: pixel-accurate native-resolution rendering
//! - **Server**: an HTTP surface for browser front-ends
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use formfill::{
//!     config::OverlayConfig,
//!     fields::FieldMap,
//!     render::font::FontBook,
//!     session::OverlaySession,
//!     template::{DisplaySize, FixedMeasurement},
//! };
//!
//! # async fn example() -> Result<(), formfill::OverlayError> {
//! // The form is shown 800px wide in the editor
//! let mut session = OverlaySession::new(
//!     OverlayConfig::default(),
//!     Arc::new(FontBook::builtin()),
//!     FixedMeasurement::new(DisplaySize::new(800.0, 533.0)),
//! );
//!
//! session.load_template(std::fs::read("blank-form.png")?).await?;
//! session.load_fields(&FieldMap::sample());
//!
//! let png = session.export_png().await?;
//! std::fs::write("filled-form.png", png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Template decoding and display measurement |
//! | [`element`] | Element store |
//! | [`transform`] | Display ↔ native coordinates |
//! | [`drag`] | Drag state machine |
//! | [`render`] | Compositing, fonts, colors |
//! | [`session`] | Session lifecycle |
//! | [`fields`] | Field data |
//! | [`extract`] | Extraction service client |
//! | [`server`] | HTTP server |
//! | [`error`] | Error types |

pub mod config;
pub mod drag;
pub mod element;
pub mod error;
pub mod extract;
pub mod fields;
pub mod logging;
pub mod render;
pub mod server;
pub mod session;
pub mod template;
pub mod transform;

// Re-exports for convenience
pub use error::OverlayError;
pub use session::OverlaySession;
