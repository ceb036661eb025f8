//! # Compositor
//!
//! Flattens the template and every text element into one raster at the
//! template's native resolution.
//!
//! ## Pipeline
//!
//! 1. Require a loaded template and a measurable display size.
//! 2. Allocate a `natural_width x natural_height` canvas and draw the template
//!    at the origin, unscaled.
//! 3. Derive the display → native scale from the *current* measurements.
//! 4. Draw each element in store order at its native position and native
//!    font size, top-aligned.
//!
//! Rendering only reads its inputs, and the output depends on nothing else,
//! so identical inputs give byte-identical PNGs.

use image::{ImageEncoder, RgbaImage, codecs::png::PngEncoder, imageops};

use crate::element::{ElementId, TextElement};
use crate::error::{OverlayError, Result};
use crate::render::color::{blend_over, color_or_black};
use crate::render::font::FontBook;
use crate::template::{TemplateImage, TemplateSource};
use crate::transform::{DisplaySize, NativePoint, ScaleTransform, to_native, to_native_font_size};

/// Text is never drawn larger than this multiple of the canvas's longer side.
/// A single glyph that size already covers the whole output.
const MAX_GLYPH_CANVAS_RATIO: f32 = 2.0;

/// Where and how large one element lands in native space.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: ElementId,
    pub origin: NativePoint,
    pub font_size_px: f32,
}

/// Native-space layout for `elements`, from the template's current state.
pub fn plan(template: &TemplateSource, elements: &[TextElement]) -> Result<(ScaleTransform, Vec<Placement>)> {
    plan_parts(template.current(), template.display_size(), elements)
}

/// [`plan`] over an already captured template and display size.
pub fn plan_parts(
    image: Option<&TemplateImage>,
    display: Option<DisplaySize>,
    elements: &[TextElement],
) -> Result<(ScaleTransform, Vec<Placement>)> {
    let image = image.ok_or(OverlayError::NoTemplate)?;
    let display = display.ok_or(OverlayError::DisplayMetricsUnavailable)?;
    let scale = ScaleTransform::derive(image.natural_width(), image.natural_height(), display)
        .ok_or(OverlayError::DisplayMetricsUnavailable)?;

    let placements = elements
        .iter()
        .map(|el| Placement {
            id: el.id,
            origin: to_native(el.position(), scale),
            font_size_px: to_native_font_size(el.font_size_px, scale.scale_x),
        })
        .collect();

    Ok((scale, placements))
}

/// Renders sessions to flattened images.
pub struct Compositor<'a> {
    fonts: &'a FontBook,
}

impl<'a> Compositor<'a> {
    pub fn new(fonts: &'a FontBook) -> Self {
        Self { fonts }
    }

    /// Composite the template and `elements` at native resolution.
    pub fn render(&self, template: &TemplateSource, elements: &[TextElement]) -> Result<RgbaImage> {
        self.render_parts(template.current(), template.display_size(), elements)
    }

    /// [`Self::render`] over an already captured template and display size.
    pub fn render_parts(
        &self,
        image: Option<&TemplateImage>,
        display: Option<DisplaySize>,
        elements: &[TextElement],
    ) -> Result<RgbaImage> {
        let (scale, placements) = plan_parts(image, display, elements)?;
        let image = image.ok_or(OverlayError::NoTemplate)?;

        let mut canvas = RgbaImage::new(image.natural_width(), image.natural_height());
        imageops::overlay(&mut canvas, image.pixels(), 0, 0);

        for (element, placement) in elements.iter().zip(&placements) {
            self.draw_text(&mut canvas, element, placement);
        }

        tracing::debug!(
            "composited {} element(s) onto {}x{} (scale {:.4} x {:.4})",
            elements.len(),
            canvas.width(),
            canvas.height(),
            scale.scale_x,
            scale.scale_y
        );
        Ok(canvas)
    }

    fn draw_text(&self, canvas: &mut RgbaImage, element: &TextElement, placement: &Placement) {
        if element.text.is_empty() {
            return;
        }
        let color = color_or_black(&element.color);
        let origin = placement.origin;
        let base_x = origin.x.floor();
        let base_y = origin.y.floor();

        let (canvas_w, canvas_h) = (canvas.width() as i64, canvas.height() as i64);
        let (left, top) = (base_x as i64, base_y as i64);
        if left >= canvas_w || top >= canvas_h {
            return;
        }
        let clip = (
            (canvas_w - left).max(0) as usize,
            (canvas_h - top).max(0) as usize,
        );
        let max_px = MAX_GLYPH_CANVAS_RATIO * canvas_w.max(canvas_h) as f32;
        let mask = self.fonts.render_text(
            &element.text,
            &element.font_family,
            placement.font_size_px.min(max_px),
            (origin.x - base_x, origin.y - base_y),
            clip,
        );

        for my in 0..mask.height {
            let y = base_y as i64 + my as i64;
            if y < 0 || y >= canvas_h {
                continue;
            }
            for mx in 0..mask.width {
                let x = base_x as i64 + mx as i64;
                if x < 0 || x >= canvas_w {
                    continue;
                }
                let coverage = mask.data[my * mask.width + mx];
                if coverage > 0.0 {
                    blend_over(canvas.get_pixel_mut(x as u32, y as u32), color, coverage);
                }
            }
        }
    }
}

/// Encode a composite as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| OverlayError::Image(format!("Failed to encode PNG: {}", e)))?;
    Ok(bytes)
}
