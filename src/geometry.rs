//! Crop and pan/zoom geometry.
//!
//! The crop rectangle and transform are expressed in on-screen pixels relative
//! to the displayed (possibly scaled) image. [`SourceRegion::map`] turns them
//! back into a region of the source image's natural pixel space.

use serde::{Deserialize, Serialize};

/// Smallest zoom factor accepted by [`TransformSpec`].
pub const MIN_SCALE: f32 = 0.1;

/// Largest zoom factor accepted by [`TransformSpec`].
pub const MAX_SCALE: f32 = 5.0;

/// Fraction of the shorter displayed side covered by the default crop.
const DEFAULT_CROP_FRACTION: f32 = 0.8;

/// A square crop rectangle in on-screen pixel coordinates.
///
/// The constructors only ever produce squares. The fields stay public so
/// callers can read them, but building one by hand bypasses that policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropSpec {
    /// X offset from the left edge of the displayed image.
    pub x: f32,
    /// Y offset from the top edge of the displayed image.
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropSpec {
    /// Creates a square crop with its top-left corner at `(x, y)`.
    ///
    /// Negative sizes collapse to zero.
    pub fn square(x: f32, y: f32, size: f32) -> Self {
        let size = size.max(0.0);
        Self {
            x,
            y,
            width: size,
            height: size,
        }
    }

    /// The crop proposed right after an image is displayed: a centered square
    /// covering 80% of the shorter side.
    pub fn centered_default(display: DisplaySize) -> Self {
        let size = display.width.min(display.height) * DEFAULT_CROP_FRACTION;
        Self::square(
            (display.width - size) / 2.0,
            (display.height - size) / 2.0,
            size,
        )
    }

    /// Builds the square produced by dragging from `start` to `current`.
    ///
    /// The side is the smaller of the two drag distances, anchored at the
    /// drag start.
    pub fn from_drag(start: (f32, f32), current: (f32, f32)) -> Self {
        let dx = (current.0 - start.0).abs();
        let dy = (current.1 - start.1).abs();
        Self::square(start.0, start.1, dx.min(dy))
    }

    /// Returns true if the crop has no area.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Returns true if width equals height.
    pub fn is_square(&self) -> bool {
        (self.width - self.height).abs() < f32::EPSILON
    }
}

/// Pan and zoom applied to the displayed image before cropping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSpec {
    #[serde(deserialize_with = "deserialize_scale")]
    scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformSpec {
    /// Creates a transform. The scale is clamped to `[0.1, 5]`.
    pub fn new(scale: f32, offset_x: f32, offset_y: f32) -> Self {
        Self {
            scale: clamp_scale(scale),
            offset_x,
            offset_y,
        }
    }

    /// Scale 1, no offset.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Sets the zoom factor, clamped to `[0.1, 5]`.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = clamp_scale(scale);
    }

    /// Adjusts the zoom factor by `delta`, clamped to `[0.1, 5]`.
    pub fn zoom_by(&mut self, delta: f32) {
        self.set_scale(self.scale + delta);
    }

    /// Moves the image by the given on-screen offset.
    pub fn pan_to(&mut self, offset_x: f32, offset_y: f32) {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
    }

    /// Returns to the identity transform.
    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

fn deserialize_scale<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f32::deserialize(deserializer).map(clamp_scale)
}

fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// The on-screen size at which the source image is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

impl DisplaySize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A display size equal to the natural image size (ratio 1).
    pub fn natural(width: u32, height: u32) -> Self {
        Self::new(width as f32, height as f32)
    }

    /// Fits a `width x height` image inside a box, preserving aspect ratio.
    pub fn fit_within(width: u32, height: u32, max_width: f32, max_height: f32) -> Self {
        let ratio = (max_width / width as f32).min(max_height / height as f32);
        Self::new(width as f32 * ratio, height as f32 * ratio)
    }
}

/// A rectangle in source-image pixel space, possibly extending past the
/// image edges when the user has panned or zoomed out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SourceRegion {
    /// Maps an on-screen crop back into source-image pixels.
    ///
    /// The displayed-vs-natural ratio is applied per axis, then the pan/zoom
    /// transform is undone:
    /// `source_x = (crop.x - offset_x) * ratio_x / scale`.
    pub fn map(
        crop: &CropSpec,
        transform: &TransformSpec,
        display: DisplaySize,
        natural_width: u32,
        natural_height: u32,
    ) -> Self {
        let ratio_x = natural_width as f32 / display.width;
        let ratio_y = natural_height as f32 / display.height;
        let scale = transform.scale();

        Self {
            x: (crop.x - transform.offset_x) * ratio_x / scale,
            y: (crop.y - transform.offset_y) * ratio_y / scale,
            width: crop.width * ratio_x / scale,
            height: crop.height * ratio_y / scale,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}
