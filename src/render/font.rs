//! Font lookup and text rasterization.
//!
//! Outline faces (TTF/OTF) are rendered with ab_glyph into an anti-aliased
//! coverage mask. Families with no loaded face use the embedded Spleen 12x24
//! bitmap font, scaled nearest-neighbour to the requested size, so a missing
//! font never aborts an export.
//!
//! Sizes are CSS pixel sizes: the em square is `px` tall. Masks are
//! top-aligned, row 0 is the top of the em box (canvas `textBaseline = "top"`).
//!
//! Masks never grow past the clip window the caller passes in, however large
//! the text is.
//!
//! DejaVu Sans Mono is bundled and answers to `monospace` (license in
//! `fonts/DejaVu-LICENSE`).

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use spleen_font::{FONT_12X24, PSF2Font};
use std::collections::HashMap;
use std::path::Path;

use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};

const BITMAP_CELL_WIDTH: usize = 12;
const BITMAP_CELL_HEIGHT: usize = 24;

/// Largest em size ever rasterized.
pub const MAX_RENDER_PX: f32 = 4096.0;

/// Name the bundled face is registered under.
pub const BUNDLED_FAMILY: &str = "DejaVu Sans Mono";

static DEJAVU_SANS_MONO: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// Pixels needed to cover `extent`, capped at `limit`. NaN and negative
/// extents need none.
fn clipped_extent(extent: f32, limit: usize) -> usize {
    (extent.max(0.0).ceil() as usize).min(limit)
}

/// Rendered text as a coverage buffer.
pub struct TextMask {
    pub width: usize,
    pub height: usize,
    /// Coverage values: 0.0 = transparent, 1.0 = fully inked.
    pub data: Vec<f32>,
}

impl TextMask {
    fn empty(width: usize, height: usize) -> Self {
        let len = width.checked_mul(height).unwrap_or(0);
        let (width, height) = if len == 0 { (0, 0) } else { (width, height) };
        Self {
            width,
            height,
            data: vec![0.0; len],
        }
    }

    #[inline]
    fn accumulate(&mut self, x: i32, y: i32, coverage: f32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            let idx = y as usize * self.width + x as usize;
            self.data[idx] = (self.data[idx] + coverage).min(1.0);
        }
    }
}

/// Measures the box a string occupies at a given size.
pub trait TextMeasure {
    /// Width and height in the same pixel space as `px`.
    fn measure(&self, text: &str, family: &str, px: f32) -> (f32, f32);
}

/// Resolved face for a family list.
pub enum Face<'a> {
    Outline(&'a FontArc),
    Bitmap,
}

/// Registry of loaded faces, keyed by lowercase name.
#[derive(Default, Clone)]
pub struct FontBook {
    faces: HashMap<String, FontArc>,
}

impl FontBook {
    /// Book with no outline faces: everything renders with the bitmap font.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Book with the bundled DejaVu Sans Mono face, also reachable as
    /// `monospace`.
    pub fn bundled() -> Result<Self> {
        let font = FontArc::try_from_slice(DEJAVU_SANS_MONO)
            .map_err(|e| OverlayError::Font(format!("bundled font: {}", e)))?;
        let mut book = Self::builtin();
        book.insert(BUNDLED_FAMILY, font);
        book.alias("monospace", BUNDLED_FAMILY);
        Ok(book)
    }

    /// The bundled faces plus whatever a config points at.
    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        let mut book = Self::bundled()?;
        if let Some(dir) = &config.font_dir {
            book.load_dir(dir)?;
        }
        for (alias, stem) in &config.font_aliases {
            if !book.alias(alias, stem) {
                tracing::warn!("font alias {:?} points at unknown face {:?}", alias, stem);
            }
        }
        Ok(book)
    }

    /// Register every `.ttf`/`.otf` in `dir` under its file stem.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
                .unwrap_or(false);
            if !is_font {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = std::fs::read(&path)?;
            let font = FontArc::try_from_vec(bytes)
                .map_err(|e| OverlayError::Font(format!("{}: {}", path.display(), e)))?;
            self.insert(stem, font);
            loaded += 1;
        }
        tracing::info!("loaded {} font face(s) from {}", loaded, dir.display());
        Ok(loaded)
    }

    pub fn insert(&mut self, name: &str, font: FontArc) {
        self.faces.insert(name.to_lowercase(), font);
    }

    /// Make `alias` resolve to the face registered as `target`.
    pub fn alias(&mut self, alias: &str, target: &str) -> bool {
        match self.faces.get(&target.to_lowercase()).cloned() {
            Some(font) => {
                self.insert(alias, font);
                true
            }
            None => false,
        }
    }

    /// Resolve a CSS-like family list (`"Arial, sans-serif"`) to the first
    /// loaded face, or the bitmap fallback.
    pub fn resolve(&self, family: &str) -> Face<'_> {
        family
            .split(',')
            .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\'').to_lowercase())
            .find_map(|name| self.faces.get(&name))
            .map(Face::Outline)
            .unwrap_or(Face::Bitmap)
    }

    /// Rasterize `text` at `px` em size. `offset` is the sub-pixel position of
    /// the text origin inside the mask's first pixel (each component in 0..1).
    /// `clip` is the largest mask (width, height) worth drawing; anything
    /// beyond it is cut off.
    pub fn render_text(
        &self,
        text: &str,
        family: &str,
        px: f32,
        offset: (f32, f32),
        clip: (usize, usize),
    ) -> TextMask {
        let px = if px.is_nan() { 0.0 } else { px.clamp(0.0, MAX_RENDER_PX) };
        match self.resolve(family) {
            Face::Outline(font) => render_outline(font, text, px, offset, clip),
            Face::Bitmap => render_bitmap(text, px, offset, clip),
        }
    }
}

impl TextMeasure for FontBook {
    fn measure(&self, text: &str, family: &str, px: f32) -> (f32, f32) {
        match self.resolve(family) {
            Face::Outline(font) => {
                let scaled = font.as_scaled(em_scale(font, px));
                let (width, _) = layout_outline(font, text, px);
                (width, scaled.ascent() - scaled.descent())
            }
            Face::Bitmap => {
                let cell = px / BITMAP_CELL_HEIGHT as f32;
                (
                    text.chars().count() as f32 * BITMAP_CELL_WIDTH as f32 * cell,
                    px,
                )
            }
        }
    }
}

/// ab_glyph scales so that ascent - descent equals the given height; CSS
/// sizes name the em square instead.
fn em_scale(font: &FontArc, em_px: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(em_px * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(em_px),
    }
}

/// Glyph ids with their caret positions, and the total advance.
fn layout_outline(font: &FontArc, text: &str, px: f32) -> (f32, Vec<(ab_glyph::GlyphId, f32)>) {
    let scaled = font.as_scaled(em_scale(font, px));
    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    let mut previous = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }

    (caret_x, glyphs)
}

fn render_outline(
    font: &FontArc,
    text: &str,
    px: f32,
    offset: (f32, f32),
    clip: (usize, usize),
) -> TextMask {
    let scale = em_scale(font, px);
    let scaled = font.as_scaled(scale);
    let (advance, glyphs) = layout_outline(font, text, px);

    let ascent = scaled.ascent();
    let width = clipped_extent(advance + offset.0 + 1.0, clip.0);
    let height = clipped_extent(ascent - scaled.descent() + offset.1 + 1.0, clip.1);
    let mut mask = TextMask::empty(width, height);
    if mask.data.is_empty() {
        return mask;
    }

    for (glyph_id, glyph_x) in glyphs {
        let glyph = glyph_id.with_scale_and_position(scale, point(offset.0 + glyph_x, offset.1 + ascent));
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        // Only rasterize glyphs that reach into the mask.
        if bounds.max.x <= 0.0
            || bounds.max.y <= 0.0
            || bounds.min.x >= mask.width as f32
            || bounds.min.y >= mask.height as f32
        {
            continue;
        }
        outlined.draw(|gx, gy, coverage| {
            let x = gx as i32 + bounds.min.x as i32;
            let y = gy as i32 + bounds.min.y as i32;
            mask.accumulate(x, y, coverage);
        });
    }

    mask
}

/// Box outline drawn for characters the bitmap font lacks.
fn draw_box(cell: &mut [bool]) {
    for x in 1..BITMAP_CELL_WIDTH - 1 {
        cell[2 * BITMAP_CELL_WIDTH + x] = true;
        cell[(BITMAP_CELL_HEIGHT - 3) * BITMAP_CELL_WIDTH + x] = true;
    }
    for y in 2..BITMAP_CELL_HEIGHT - 2 {
        cell[y * BITMAP_CELL_WIDTH + 1] = true;
        cell[y * BITMAP_CELL_WIDTH + BITMAP_CELL_WIDTH - 2] = true;
    }
}

fn render_bitmap(text: &str, px: f32, offset: (f32, f32), clip: (usize, usize)) -> TextMask {
    let cell_scale = px / BITMAP_CELL_HEIGHT as f32;
    let advance = BITMAP_CELL_WIDTH as f32 * cell_scale;

    // One 12x24 cell per character, row-major, `true` = inked.
    let mut spleen = PSF2Font::new(FONT_12X24).ok();
    let cells: Vec<Vec<bool>> = text
        .chars()
        .map(|ch| {
            let mut cell = vec![false; BITMAP_CELL_WIDTH * BITMAP_CELL_HEIGHT];
            let mut utf8 = [0u8; 4];
            let glyph = spleen
                .as_mut()
                .and_then(|font| font.glyph_for_utf8(ch.encode_utf8(&mut utf8).as_bytes()));
            match glyph {
                Some(glyph) => {
                    for (row_y, row) in glyph.enumerate() {
                        for (col_x, on) in row.enumerate() {
                            if row_y < BITMAP_CELL_HEIGHT && col_x < BITMAP_CELL_WIDTH {
                                cell[row_y * BITMAP_CELL_WIDTH + col_x] = on;
                            }
                        }
                    }
                }
                None if !ch.is_whitespace() => draw_box(&mut cell),
                None => {}
            }
            cell
        })
        .collect();

    let total_width = cells.len() as f32 * advance;
    let width = clipped_extent(total_width + offset.0, clip.0);
    let height = clipped_extent(px + offset.1, clip.1);
    let mut mask = TextMask::empty(width, height);
    if cells.is_empty() || mask.data.is_empty() {
        return mask;
    }

    // Sample at pixel centres so the scaled glyph stays aligned with the
    // fractional origin.
    for my in 0..height {
        let ty = (my as f32 + 0.5 - offset.1) / cell_scale;
        if ty < 0.0 || ty >= BITMAP_CELL_HEIGHT as f32 {
            continue;
        }
        let gy = ty as usize;
        for mx in 0..width {
            let tx = (mx as f32 + 0.5 - offset.0) / cell_scale;
            if tx < 0.0 {
                continue;
            }
            let column = tx as usize;
            let (index, gx) = (column / BITMAP_CELL_WIDTH, column % BITMAP_CELL_WIDTH);
            if let Some(cell) = cells.get(index) {
                if cell[gy * BITMAP_CELL_WIDTH + gx] {
                    mask.data[my * width + mx] = 1.0;
                }
            }
        }
    }

    mask
}
