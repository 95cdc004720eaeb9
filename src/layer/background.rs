//! Background removal layer.

use image::{Rgba, RgbaImage};
use tracing::debug;

use super::{LayerConfig, LayerEffect, RenderContext};
use crate::error::Result;

/// Keys out the flat background surrounding the subject.
///
/// The background color is the alpha-weighted average of the four corner
/// pixels of the drawn canvas. Pixels whose RGB distance to it is within
/// `tolerance` (as a fraction of the largest possible distance) become
/// transparent; pixels within twice the tolerance fade out linearly.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundRemovalConfig {
    /// Match tolerance in `[0, 1]`.
    pub tolerance: f32,
}

impl BackgroundRemovalConfig {
    /// The tolerance is clamped to 0.0-1.0.
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance: tolerance.clamp(0.0, 1.0),
        }
    }
}

impl Default for BackgroundRemovalConfig {
    fn default() -> Self {
        Self::new(0.12)
    }
}

impl LayerConfig for BackgroundRemovalConfig {
    fn differs_from(&self, other: &Self) -> bool {
        (self.tolerance - other.tolerance).abs() > 0.0001
    }
}

impl LayerEffect for BackgroundRemovalConfig {
    fn transform(&self, ctx: &mut RenderContext) -> Result<()> {
        let Some(key) = corner_color(&ctx.image) else {
            debug!("corners are transparent, nothing to key out");
            return Ok(());
        };

        let max_distance = (3.0f32 * 255.0 * 255.0).sqrt();
        let inner = self.tolerance * max_distance;
        let outer = inner * 2.0;

        for pixel in ctx.image.pixels_mut() {
            if pixel[3] == 0 {
                continue;
            }
            let distance = rgb_distance(pixel, &key);
            let keep = if distance <= inner {
                0.0
            } else if distance >= outer || outer <= inner {
                1.0
            } else {
                (distance - inner) / (outer - inner)
            };
            pixel[3] = (pixel[3] as f32 * keep).round() as u8;
        }

        Ok(())
    }
}

/// Averages the opaque-weighted color of the four corners.
fn corner_color(image: &RgbaImage) -> Option<[f32; 3]> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let corners = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)];
    let mut total = [0.0f32; 3];
    let mut weight = 0.0f32;

    for (x, y) in corners {
        let p = image.get_pixel(x, y);
        let a = p[3] as f32;
        total[0] += p[0] as f32 * a;
        total[1] += p[1] as f32 * a;
        total[2] += p[2] as f32 * a;
        weight += a;
    }

    (weight > 0.0).then(|| total.map(|c| c / weight))
}

fn rgb_distance(pixel: &Rgba<u8>, key: &[f32; 3]) -> f32 {
    let dr = pixel[0] as f32 - key[0];
    let dg = pixel[1] as f32 - key[1];
    let db = pixel[2] as f32 - key[2];
    (dr * dr + dg * dg + db * db).sqrt()
}
