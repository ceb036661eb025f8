//! CSS-style color strings → RGBA.
//!
//! Unparseable colors render black, the same as a canvas that keeps its
//! default fill style when given an invalid one.

use image::Rgba;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)`
/// or a basic named color.
pub fn parse_color(input: &str) -> Option<Rgba<u8>> {
    let s = input.trim().to_ascii_lowercase();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(args) = s.strip_prefix("rgba(").or_else(|| s.strip_prefix("rgb(")) {
        return parse_rgb_args(args.strip_suffix(')')?);
    }
    named(&s)
}

/// [`parse_color`], falling back to black.
pub fn color_or_black(input: &str) -> Rgba<u8> {
    parse_color(input).unwrap_or(BLACK)
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba<u8>> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |p: &str| p.parse::<f32>().ok().map(|v| v.round().clamp(0.0, 255.0) as u8);
    let alpha = match parts.get(3) {
        Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };
    Some(Rgba([
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        alpha,
    ]))
}

fn named(name: &str) -> Option<Rgba<u8>> {
    let rgb = match name {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "blue" => [0, 0, 255],
        "navy" => [0, 0, 128],
        "gray" | "grey" => [128, 128, 128],
        "darkblue" => [0, 0, 139],
        "transparent" => return Some(Rgba([0, 0, 0, 0])),
        _ => return None,
    };
    Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Source-over blend of `color` at `coverage` (0.0..=1.0) onto `dst`.
#[inline]
pub fn blend_over(dst: &mut Rgba<u8>, color: Rgba<u8>, coverage: f32) {
    let src_a = coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for c in 0..3 {
        let src_c = color[c] as f32;
        let dst_c = dst[c] as f32;
        let out_c = (src_c * src_a + dst_c * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = out_c.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
