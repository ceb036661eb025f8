//! # Rendering Module
//!
//! Produces the flattened export image.
//!
//! ## Modules
//!
//! - [`compositor`]: template + elements → native-resolution RGBA, PNG encoding
//! - [`font`]: font registry and text rasterization (TTF or bitmap fallback)
//! - [`color`]: CSS color parsing and alpha blending
//!
//! ## Usage Example
//!
//! ```
//! use formfill::render::{compositor::{self, Compositor}, font::FontBook};
//! use formfill::template::{FixedMeasurement, TemplateSource, DisplaySize};
//!
//! let source = TemplateSource::new(FixedMeasurement::new(DisplaySize::new(800.0, 533.0)));
//! let fonts = FontBook::builtin();
//!
//! // Nothing loaded yet
//! assert!(Compositor::new(&fonts).render(&source, &[]).is_err());
//! # let _ = compositor::encode_png;
//! ```

pub mod color;
pub mod compositor;
pub mod font;
