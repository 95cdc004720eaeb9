//! Seasonal theme overlay.
//!
//! A seasonal effect is drawn in three fixed steps on top of whatever the
//! earlier layers produced:
//!
//! 1. a translucent wash of the theme's filter color, blended with `overlay`
//! 2. a white, 90% opaque circular badge anchored to the top-right corner
//! 3. the theme glyph centered in the badge
//!
//! Everything is computed from the canvas size and the theme alone, so the
//! same inputs always produce the same pixels.

use std::fmt;
use std::str::FromStr;

use palette::Srgb;
use resvg::tiny_skia::{FillRule, Paint, PathBuilder, Transform};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::blend::{wash, BlendMode};
use super::svg::{composite_over, pixmap_to_rgba, render_glyph, rgba_to_pixmap, GlyphSource};
use super::{LayerConfig, LayerEffect, RenderContext};
use crate::error::Result;

/// Badge glyph side as a fraction of the canvas size.
const BADGE_FRACTION: f32 = 0.35;

/// Corner padding as a fraction of the canvas size.
const PADDING_FRACTION: f32 = 0.05;

/// Badge fill alpha (white at 90%).
const BADGE_ALPHA: u8 = 230;

// ============================================================================
// SeasonalTheme
// ============================================================================

/// The available seasonal themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SeasonalTheme {
    Snow,
    Valentine,
    Halloween,
    Celebration,
}

/// Colors and glyph of a theme.
#[derive(Debug, Clone, Copy)]
pub struct ThemeStyle {
    /// Color of the translucent wash.
    pub filter_color: Srgb<u8>,
    pub filter_opacity: f32,
    /// Fill color for the built-in glyph.
    pub accent: Srgb<u8>,
    pub emoji: &'static str,
    glyph_svg: &'static str,
}

impl SeasonalTheme {
    pub const ALL: [SeasonalTheme; 4] = [
        Self::Snow,
        Self::Valentine,
        Self::Halloween,
        Self::Celebration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snow => "snow",
            Self::Valentine => "valentine",
            Self::Halloween => "halloween",
            Self::Celebration => "celebration",
        }
    }

    /// The filename prefix for exports, e.g. `halloween-`.
    pub fn file_prefix(self) -> String {
        format!("{}-", self.as_str())
    }

    pub fn style(self) -> ThemeStyle {
        match self {
            Self::Snow => ThemeStyle {
                filter_color: Srgb::<u8>::new(0xE3, 0xF2, 0xFD),
                filter_opacity: 0.30,
                accent: Srgb::<u8>::new(0x4A, 0x90, 0xE2),
                emoji: "❄️",
                glyph_svg: SNOWFLAKE_SVG,
            },
            Self::Valentine => ThemeStyle {
                filter_color: Srgb::<u8>::new(0xFC, 0xE4, 0xEC),
                filter_opacity: 0.35,
                accent: Srgb::<u8>::new(0xE9, 0x1E, 0x63),
                emoji: "❤️",
                glyph_svg: HEART_SVG,
            },
            Self::Halloween => ThemeStyle {
                filter_color: Srgb::<u8>::new(0xFF, 0xF3, 0xE0),
                filter_opacity: 0.25,
                accent: Srgb::<u8>::new(0xFF, 0x6F, 0x00),
                emoji: "🎃",
                glyph_svg: PUMPKIN_SVG,
            },
            Self::Celebration => ThemeStyle {
                filter_color: Srgb::<u8>::new(0xFF, 0xF9, 0xC4),
                filter_opacity: 0.30,
                accent: Srgb::<u8>::new(0xFF, 0xC1, 0x07),
                emoji: "🎉",
                glyph_svg: PARTY_SVG,
            },
        }
    }
}

impl ThemeStyle {
    /// The glyph source and the fill to apply to it.
    ///
    /// Twemoji artwork is full color and drawn as-is; the built-in glyphs are
    /// monochrome and take the accent color.
    pub fn glyph(&self) -> (GlyphSource, Option<[u8; 3]>) {
        #[cfg(feature = "twemoji")]
        if let Some(source) = GlyphSource::from_emoji(self.emoji) {
            return (source, None);
        }

        let accent = [self.accent.red, self.accent.green, self.accent.blue];
        (GlyphSource::from_svg(self.glyph_svg), Some(accent))
    }
}

impl fmt::Display for SeasonalTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonalTheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str() == s)
            .ok_or_else(|| format!("unknown seasonal theme `{s}`"))
    }
}

// ============================================================================
// SeasonalConfig
// ============================================================================

/// Configuration for the seasonal overlay layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalConfig {
    pub theme: SeasonalTheme,
}

impl SeasonalConfig {
    pub fn new(theme: SeasonalTheme) -> Self {
        Self { theme }
    }
}

impl LayerConfig for SeasonalConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self.theme != other.theme
    }
}

impl LayerEffect for SeasonalConfig {
    fn transform(&self, ctx: &mut RenderContext) -> Result<()> {
        let style = self.theme.style();
        let size = ctx.image.width();

        wash(
            &mut ctx.image,
            style.filter_color,
            style.filter_opacity,
            BlendMode::Overlay,
        )?;

        let badge = BadgeGeometry::for_canvas(size);
        draw_badge(ctx, &badge)?;

        if badge.glyph_size == 0 {
            debug!(size, "canvas too small for a seasonal glyph");
            return Ok(());
        }

        let (source, fill) = style.glyph();
        let glyph = render_glyph(&source, badge.glyph_size, fill)?;
        let half = badge.glyph_size as f32 / 2.0;
        composite_over(
            &mut ctx.image,
            &glyph,
            (badge.center_x - half).round() as i32,
            (badge.center_y - half).round() as i32,
        );

        Ok(())
    }
}

/// Placement of the badge for a given canvas size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeGeometry {
    pub glyph_size: u32,
    pub padding: u32,
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
}

impl BadgeGeometry {
    pub fn for_canvas(size: u32) -> Self {
        let glyph_size = (size as f32 * BADGE_FRACTION).floor() as u32;
        let padding = (size as f32 * PADDING_FRACTION).floor() as u32;
        let half = glyph_size as f32 / 2.0;

        Self {
            glyph_size,
            padding,
            center_x: size as f32 - padding as f32 - half,
            center_y: padding as f32 + half,
            radius: half + padding as f32 / 2.0,
        }
    }
}

fn draw_badge(ctx: &mut RenderContext, badge: &BadgeGeometry) -> Result<()> {
    let Some(circle) = PathBuilder::from_circle(badge.center_x, badge.center_y, badge.radius)
    else {
        return Ok(());
    };

    let mut pixmap = rgba_to_pixmap(&ctx.image)?;
    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, BADGE_ALPHA);
    paint.anti_alias = true;
    pixmap.fill_path(&circle, &paint, FillRule::Winding, Transform::identity(), None);

    ctx.image = pixmap_to_rgba(&pixmap);
    Ok(())
}

// ============================================================================
// Built-in glyphs
// ============================================================================

const SNOWFLAKE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><g stroke="#000000" stroke-width="2" stroke-linecap="round" fill="none"><path d="M12 2v20M3.3 7l17.4 10M3.3 17l17.4-10"/><path d="M9 4l3 2 3-2M9 20l3-2 3 2"/></g></svg>"##;

const HEART_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><path fill="#000000" d="M12 21.35l-1.45-1.32C5.4 15.36 2 12.28 2 8.5 2 5.42 4.42 3 7.5 3c1.74 0 3.41.81 4.5 2.09C13.09 3.81 14.76 3 16.5 3 19.58 3 22 5.42 22 8.5c0 3.78-3.4 6.86-8.55 11.54L12 21.35z"/></svg>"##;

const PUMPKIN_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><rect fill="#000000" x="11" y="2" width="2" height="5" rx="1"/><ellipse fill="#000000" cx="8" cy="14" rx="6" ry="7"/><ellipse fill="#000000" cx="16" cy="14" rx="6" ry="7"/><ellipse fill="#000000" cx="12" cy="14" rx="5" ry="7.5"/></svg>"##;

const PARTY_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24"><path fill="#000000" d="M2 22l5-14 9 9z"/><circle fill="#000000" cx="15" cy="4" r="1.5"/><circle fill="#000000" cx="20" cy="9" r="1.5"/><circle fill="#000000" cx="19" cy="3" r="1"/><path stroke="#000000" stroke-width="1.5" fill="none" d="M11 7c1-2 0-3 1-5M17 13c2-1 3 0 5-1"/></svg>"##;
