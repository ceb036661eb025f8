//! # Coordinate Transform
//!
//! Conversion between display space (layout pixels of the on-screen preview)
//! and native space (pixels of the template asset).
//!
//! The transform is derived from the current measurements every time it is
//! needed and never stored, so a layout change can never leave a stale scale
//! behind.
//!
//! Font sizes scale by `scale_x` alone. When the preview is not an exact
//! aspect-preserving fit, text is therefore sized from the horizontal factor
//! only; exports must keep doing this to match previously exported forms.

use serde::{Deserialize, Serialize};

/// Size at which the template is currently rendered, in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

impl DisplaySize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Size of a template laid out at `width` with its aspect ratio kept
    /// (the `width: 100%; height: auto` case).
    pub fn fit_width(width: f32, natural_width: u32, natural_height: u32) -> Self {
        Self {
            width,
            height: width * natural_height as f32 / natural_width as f32,
        }
    }

    /// Clamp a point into `[0, width] x [0, height]`.
    pub fn clamp(&self, point: DisplayPoint) -> DisplayPoint {
        DisplayPoint {
            x: clamp_axis(point.x, self.width),
            y: clamp_axis(point.y, self.height),
        }
    }
}

fn clamp_axis(v: f32, max: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, max.max(0.0))
}

/// Position in display space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Position in native (template pixel) space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NativePoint {
    pub x: f32,
    pub y: f32,
}

/// Display → native scale factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    pub scale_x: f32,
    pub scale_y: f32,
}

impl ScaleTransform {
    /// Derive the transform from the template's natural size and the current
    /// display size. Returns `None` when the display size is unusable.
    pub fn derive(natural_width: u32, natural_height: u32, display: DisplaySize) -> Option<Self> {
        if !display.is_valid() || natural_width == 0 || natural_height == 0 {
            return None;
        }
        Some(Self {
            scale_x: natural_width as f32 / display.width,
            scale_y: natural_height as f32 / display.height,
        })
    }
}

/// Map a display-space point into native space.
pub fn to_native(point: DisplayPoint, scale: ScaleTransform) -> NativePoint {
    NativePoint {
        x: point.x * scale.scale_x,
        y: point.y * scale.scale_y,
    }
}

/// Map a display-space font size into native space (horizontal factor only).
pub fn to_native_font_size(display_font_size_px: f32, scale_x: f32) -> f32 {
    display_font_size_px * scale_x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_derive_scale() {
        let scale = ScaleTransform::derive(3000, 2000, DisplaySize::new(800.0, 533.0)).unwrap();
        assert!(approx(scale.scale_x, 3.75));
        assert!(approx(scale.scale_y, 2000.0 / 533.0));
    }

    #[test]
    fn test_derive_rejects_unmeasured_display() {
        assert!(ScaleTransform::derive(100, 100, DisplaySize::new(0.0, 50.0)).is_none());
        assert!(ScaleTransform::derive(100, 100, DisplaySize::new(50.0, -1.0)).is_none());
        assert!(ScaleTransform::derive(100, 100, DisplaySize::new(f32::NAN, 50.0)).is_none());
    }

    #[test]
    fn test_native_x_is_display_x_times_scale() {
        for (nw, dw) in [(3000u32, 800.0f32), (640, 640.0), (1024, 333.0), (50, 400.0)] {
            let scale = ScaleTransform::derive(nw, 100, DisplaySize::new(dw, 100.0)).unwrap();
            for x in [0.0f32, 1.0, 17.5, 123.25, dw] {
                let native = to_native(DisplayPoint::new(x, 0.0), scale);
                assert!(approx(native.x, x * nw as f32 / dw), "x={} nw={} dw={}", x, nw, dw);
            }
        }
    }

    #[test]
    fn test_font_size_ignores_vertical_scale() {
        // Stretched preview: horizontal factor 2, vertical factor 4.
        let scale = ScaleTransform::derive(200, 400, DisplaySize::new(100.0, 100.0)).unwrap();
        assert!(approx(to_native_font_size(10.0, scale.scale_x), 20.0));
        assert!(!approx(to_native_font_size(10.0, scale.scale_x), 10.0 * scale.scale_y));
    }

    #[test]
    fn test_clamp() {
        let display = DisplaySize::new(400.0, 300.0);
        assert_eq!(display.clamp(DisplayPoint::new(-50.0, 10.0)), DisplayPoint::new(0.0, 10.0));
        assert_eq!(display.clamp(DisplayPoint::new(500.0, 301.0)), DisplayPoint::new(400.0, 300.0));
        assert_eq!(display.clamp(DisplayPoint::new(f32::NAN, 5.0)), DisplayPoint::new(0.0, 5.0));
    }

    #[test]
    fn test_fit_width() {
        let size = DisplaySize::fit_width(800.0, 3000, 2000);
        assert!(approx(size.height, 533.333));
    }
}
