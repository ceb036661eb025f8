//! # Configuration
//!
//! Defaults for newly placed elements, font lookup and export naming.
//! Every field has a default so a config file only needs the keys it changes.
//!
//! ```json
//! {
//!   "layout": { "stagger": 60, "font_family": "Inter" },
//!   "font_dir": "/usr/share/fonts/truetype/inter",
//!   "output_filename": "signed-form.png"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{OverlayError, Result};

/// Placement and style given to elements created by a field batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutDefaults {
    /// Left edge of every new element, in display pixels.
    pub origin_x: f32,
    /// Top edge of the first element, in display pixels.
    pub origin_y: f32,
    /// Vertical distance between consecutive elements.
    pub stagger: f32,
    pub font_size_px: f32,
    pub font_family: String,
    pub color: String,
}

impl Default for LayoutDefaults {
    fn default() -> Self {
        Self {
            origin_x: 50.0,
            origin_y: 50.0,
            stagger: 40.0,
            font_size_px: 24.0,
            font_family: "Arial".to_string(),
            color: "#000000".to_string(),
        }
    }
}

/// Core overlay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub layout: LayoutDefaults,
    /// Directory scanned for `.ttf`/`.otf` faces. Without it every family
    /// falls back to the built-in bitmap font.
    pub font_dir: Option<PathBuf>,
    /// Extra family names mapped to a font file stem (e.g. `"Arial" -> "LiberationSans-Regular"`).
    pub font_aliases: HashMap<String, String>,
    /// Suggested download name for exports.
    pub output_filename: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            layout: LayoutDefaults::default(),
            font_dir: None,
            font_aliases: HashMap::new(),
            output_filename: "filled-form.png".to_string(),
        }
    }
}

impl OverlayConfig {
    /// Load a config file (JSON).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: OverlayConfig = serde_json::from_str(&raw)
            .map_err(|e| OverlayError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        if !layout.stagger.is_finite() || layout.stagger < 0.0 {
            return Err(OverlayError::Config(format!(
                "layout.stagger must be a non-negative number, got {}",
                layout.stagger
            )));
        }
        if !layout.font_size_px.is_finite() || layout.font_size_px <= 0.0 {
            return Err(OverlayError::Config(format!(
                "layout.font_size_px must be positive, got {}",
                layout.font_size_px
            )));
        }
        if self.output_filename.trim().is_empty() {
            return Err(OverlayError::Config(
                "output_filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
