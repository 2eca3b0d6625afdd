//! Image-space to viewport-space mapping for the detection overlay.
//!
//! Pure functions, recomputed every display frame; nothing here holds state.

use crate::shared::detection::Detection;

/// An axis-aligned box in viewport coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Uniform letterbox mapping: one scale plus centering offsets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Letterbox {
    pub const IDENTITY: Letterbox = Letterbox {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// Map an image-space box into viewport space.
    pub fn map_box(&self, detection: &Detection) -> DisplayBox {
        DisplayBox {
            left: detection.left * self.scale + self.offset_x,
            top: detection.top * self.scale + self.offset_y,
            right: detection.right * self.scale + self.offset_x,
            bottom: detection.bottom * self.scale + self.offset_y,
        }
    }
}

/// Fit an image into a viewport preserving aspect ratio.
///
/// The image is scaled by a single factor — bound by width when the image is
/// proportionally wider than the viewport, by height otherwise — and
/// centered, leaving symmetric margins on one axis. Degenerate dimensions
/// yield the identity mapping rather than NaN offsets.
pub fn letterbox_fit(image_w: f32, image_h: f32, viewport_w: f32, viewport_h: f32) -> Letterbox {
    if image_w <= 0.0 || image_h <= 0.0 || viewport_w <= 0.0 || viewport_h <= 0.0 {
        return Letterbox::IDENTITY;
    }

    let image_aspect = image_w / image_h;
    let viewport_aspect = viewport_w / viewport_h;

    let scale = if image_aspect > viewport_aspect {
        viewport_w / image_w
    } else {
        viewport_h / image_h
    };

    Letterbox {
        scale,
        offset_x: (viewport_w - image_w * scale) / 2.0,
        offset_y: (viewport_h - image_h * scale) / 2.0,
    }
}
