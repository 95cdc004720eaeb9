//! Color overlay layer configuration and application.

use palette::Srgb;

use super::blend::{wash, BlendMode};
use super::{LayerConfig, LayerEffect, RenderContext};
use crate::error::Result;

/// A solid color composited over the whole canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorOverlayConfig {
    pub color: Srgb<u8>,

    /// Opacity in `[0, 1]`.
    pub opacity: f32,

    pub blend_mode: BlendMode,
}

impl ColorOverlayConfig {
    /// Creates an overlay. The opacity is clamped to 0.0-1.0.
    pub fn new(color: Srgb<u8>, opacity: f32, blend_mode: BlendMode) -> Self {
        Self {
            color,
            opacity: clamp_opacity(opacity),
            blend_mode,
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = clamp_opacity(opacity);
    }
}

impl Default for ColorOverlayConfig {
    /// Black at half opacity, multiplied.
    fn default() -> Self {
        Self::new(Srgb::<u8>::new(0, 0, 0), 0.5, BlendMode::Multiply)
    }
}

pub(crate) fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        0.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

impl LayerConfig for ColorOverlayConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.color != other.color
            || self.blend_mode != other.blend_mode
            || (self.opacity - other.opacity).abs() > 0.0001
    }
}

impl LayerEffect for ColorOverlayConfig {
    fn transform(&self, ctx: &mut RenderContext) -> Result<()> {
        wash(&mut ctx.image, self.color, self.opacity, self.blend_mode)
    }
}
