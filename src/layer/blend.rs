//! Blend modes for solid-color washes.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use palette::Srgb;
use resvg::tiny_skia::{self, Paint, Rect};
use serde::{Deserialize, Serialize};

use super::svg::{pixmap_to_rgba, rgba_to_pixmap};
use crate::error::{FaviconError, Result};

/// Pixel compositing rule used when a color is washed over the canvas.
///
/// The names follow the CSS/canvas `globalCompositeOperation` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum BlendMode {
    Normal,
    #[default]
    Multiply,
    Overlay,
    SoftLight,
    HardLight,
    ColorBurn,
    ColorDodge,
}

impl BlendMode {
    /// All modes in the order the editor lists them.
    pub const ALL: [BlendMode; 7] = [
        Self::Multiply,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::ColorBurn,
        Self::ColorDodge,
        Self::Normal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Multiply => "multiply",
            Self::Overlay => "overlay",
            Self::SoftLight => "soft-light",
            Self::HardLight => "hard-light",
            Self::ColorBurn => "color-burn",
            Self::ColorDodge => "color-dodge",
        }
    }

    fn to_skia(self) -> tiny_skia::BlendMode {
        match self {
            Self::Normal => tiny_skia::BlendMode::SourceOver,
            Self::Multiply => tiny_skia::BlendMode::Multiply,
            Self::Overlay => tiny_skia::BlendMode::Overlay,
            Self::SoftLight => tiny_skia::BlendMode::SoftLight,
            Self::HardLight => tiny_skia::BlendMode::HardLight,
            Self::ColorBurn => tiny_skia::BlendMode::ColorBurn,
            Self::ColorDodge => tiny_skia::BlendMode::ColorDodge,
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown blend mode `{s}`"))
    }
}

/// Parses a `#rrggbb` (or `rrggbb`) hex color.
pub fn parse_hex(color: &str) -> Result<Srgb<u8>> {
    Srgb::<u8>::from_str(color.trim()).map_err(|_| FaviconError::InvalidColor(color.to_string()))
}

/// Formats a color as lowercase `#rrggbb`.
pub fn to_hex(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Fills the whole canvas with `color` at `opacity` using `mode`.
///
/// Equivalent to a canvas `fillRect` over the full surface with
/// `globalAlpha = opacity` and `globalCompositeOperation = mode`.
pub fn wash(canvas: &mut RgbaImage, color: Srgb<u8>, opacity: f32, mode: BlendMode) -> Result<()> {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity == 0.0 {
        return Ok(());
    }

    let (width, height) = canvas.dimensions();
    let rect = Rect::from_xywh(0.0, 0.0, width as f32, height as f32)
        .ok_or(FaviconError::InvalidSize(width))?;

    let mut pixmap = rgba_to_pixmap(canvas)?;
    let mut paint = Paint::default();
    paint.set_color_rgba8(
        color.red,
        color.green,
        color.blue,
        (opacity * 255.0).round() as u8,
    );
    paint.blend_mode = mode.to_skia();
    paint.anti_alias = false;

    pixmap.fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);
    *canvas = pixmap_to_rgba(&pixmap);
    Ok(())
}
