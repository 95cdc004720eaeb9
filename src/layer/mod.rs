//! Effect layers applied to the drawn favicon canvas.
//!
//! Each layer wraps an optional configuration and an enabled flag, so an
//! effect can be toggled off and back on without losing its settings.
//! Layer configs implement [`LayerEffect`], which transforms the canvas held
//! in a [`RenderContext`].
//!
//! The order is fixed by [`LayerPipeline`]:
//!
//! ```text
//! drawn source region
//!     │
//!     ▼
//! ┌──────────────┐
//! │  Background  │  key out the flat backdrop
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ Color overlay│  solid color, chosen blend mode and opacity
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │   Seasonal   │  themed wash, badge and glyph
//! └──────┬───────┘
//!        ▼
//!   rendered favicon
//! ```

pub mod background;
pub mod blend;
pub mod color_overlay;
pub mod seasonal;
pub mod svg;

pub use background::BackgroundRemovalConfig;
pub use blend::BlendMode;
pub use color_overlay::ColorOverlayConfig;
pub use seasonal::{SeasonalConfig, SeasonalTheme};
pub use svg::GlyphSource;

use image::RgbaImage;
use tracing::trace;

use crate::error::Result;

// ============================================================================
// Render Context
// ============================================================================

/// The canvas flowing through the pipeline.
pub struct RenderContext {
    pub image: RgbaImage,
}

impl RenderContext {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Canvas side length. Canvases are always square.
    pub fn size(&self) -> u32 {
        self.image.width()
    }
}

// ============================================================================
// Layer Traits
// ============================================================================

/// Trait for layer configuration types.
pub trait LayerConfig: Clone {
    /// Returns true if this config differs from another in a way that
    /// would produce different rendering output.
    fn differs_from(&self, other: &Self) -> bool;
}

/// Trait for layer configurations that know how to apply themselves.
pub trait LayerEffect: LayerConfig {
    /// Transforms `ctx.image` in place.
    fn transform(&self, ctx: &mut RenderContext) -> Result<()>;
}

// ============================================================================
// Generic Layer
// ============================================================================

/// A toggleable layer holding an optional configuration.
#[derive(Debug, Clone)]
pub struct Layer<C: LayerConfig> {
    config: Option<C>,
    enabled: bool,
}

impl<C: LayerConfig> Default for Layer<C> {
    fn default() -> Self {
        Self {
            config: None,
            enabled: true,
        }
    }
}

impl<C: LayerConfig> Layer<C> {
    pub fn config(&self) -> Option<&C> {
        self.config.as_ref()
    }

    /// Returns true if this layer is active (has config AND is enabled).
    pub fn is_active(&self) -> bool {
        self.enabled && self.config.is_some()
    }

    pub fn has_config(&self) -> bool {
        self.config.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets whether the layer is enabled. Returns true if the state changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.enabled != enabled;
        self.enabled = enabled;
        changed
    }

    /// Sets the configuration. Returns true if it changed.
    pub fn set_config(&mut self, config: Option<C>) -> bool {
        let differs = match (&self.config, &config) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(old), Some(new)) => old.differs_from(new),
        };

        if differs {
            self.config = config;
        }
        differs
    }
}

impl<C: LayerEffect> Layer<C> {
    /// Applies the layer if it is active; otherwise the canvas passes through.
    pub fn apply(&self, ctx: &mut RenderContext) -> Result<()> {
        match self.config.as_ref() {
            Some(config) if self.enabled => config.transform(ctx),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Layer Pipeline
// ============================================================================

/// All effect layers, applied in a fixed order.
#[derive(Debug, Clone, Default)]
pub struct LayerPipeline {
    pub background: Layer<BackgroundRemovalConfig>,
    pub color: Layer<ColorOverlayConfig>,
    pub seasonal: Layer<SeasonalConfig>,
}

impl LayerPipeline {
    /// Runs the drawn canvas through every active layer.
    pub fn render(&self, canvas: RgbaImage) -> Result<RgbaImage> {
        let mut ctx = RenderContext::new(canvas);

        self.background.apply(&mut ctx)?;
        self.color.apply(&mut ctx)?;
        self.seasonal.apply(&mut ctx)?;

        trace!(
            size = ctx.size(),
            background = self.background.is_active(),
            color = self.color.is_active(),
            seasonal = self.seasonal.is_active(),
            "layers applied"
        );

        Ok(ctx.image)
    }

    /// Clears every layer's configuration.
    pub fn clear(&mut self) {
        self.background.set_config(None);
        self.color.set_config(None);
        self.seasonal.set_config(None);
    }

    /// The active seasonal theme, if any.
    pub fn seasonal_theme(&self) -> Option<SeasonalTheme> {
        if self.seasonal.is_active() {
            self.seasonal.config().map(|c| c.theme)
        } else {
            None
        }
    }
}
