//! Glyph rasterization and pixel-buffer plumbing between `image` and `tiny-skia`.
//!
//! Seasonal badges draw their glyph from an SVG document. This module parses
//! and renders those documents with resvg, converts between the premultiplied
//! [`Pixmap`] that tiny-skia draws into and the straight-alpha [`RgbaImage`]
//! the rest of the crate uses, and composites rasters with source-over.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, PremultipliedColorU8, Transform};
use resvg::usvg::{Options, Tree};

use crate::error::{FaviconError, Result};

// ============================================================================
// GlyphSource
// ============================================================================

/// Where a badge glyph's SVG comes from.
///
/// `Emoji` sources resolve through Twemoji and are only renderable when the
/// `twemoji` feature is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlyphSource {
    /// Raw SVG markup.
    Raw(String),

    /// An emoji character, resolved to its Twemoji SVG at render time.
    Emoji(String),
}

impl GlyphSource {
    pub fn from_svg(svg: impl Into<String>) -> Self {
        Self::Raw(svg.into())
    }

    /// Creates an emoji source.
    ///
    /// Returns `None` if Twemoji has no asset for the emoji.
    #[cfg(feature = "twemoji")]
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        use twemoji_assets::svg::SvgTwemojiAsset;

        SvgTwemojiAsset::from_emoji(emoji)?;
        Some(Self::Emoji(emoji.to_string()))
    }

    /// Resolves the source to SVG markup.
    pub fn resolve(&self) -> Option<&str> {
        match self {
            Self::Raw(svg) => Some(svg.as_str()),
            #[cfg(feature = "twemoji")]
            Self::Emoji(emoji) => {
                use twemoji_assets::svg::SvgTwemojiAsset;
                let asset = SvgTwemojiAsset::from_emoji(emoji)?;
                Some(asset.as_ref())
            }
            #[cfg(not(feature = "twemoji"))]
            Self::Emoji(_) => None,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders a glyph so that it fits a `size x size` square, centered.
///
/// If `fill` is given, every `fill`/`stroke` attribute other than `none` is
/// rewritten to that color first, which is how monochrome glyphs get their
/// theme accent.
pub fn render_glyph(source: &GlyphSource, size: u32, fill: Option<[u8; 3]>) -> Result<RgbaImage> {
    let markup = source
        .resolve()
        .ok_or_else(|| FaviconError::Svg(format!("unresolvable glyph source {source:?}")))?;

    let markup = match fill {
        Some([r, g, b]) => recolor(markup, &format!("#{r:02x}{g:02x}{b:02x}")),
        None => markup.to_string(),
    };

    let tree = Tree::from_str(&markup, &Options::default())
        .map_err(|e| FaviconError::Svg(e.to_string()))?;

    let mut pixmap = Pixmap::new(size, size).ok_or(FaviconError::InvalidSize(size))?;

    let svg_size = tree.size();
    let scale = size as f32 / svg_size.width().max(svg_size.height());
    let dx = (size as f32 - svg_size.width() * scale) / 2.0;
    let dy = (size as f32 - svg_size.height() * scale) / 2.0;
    let transform = Transform::from_scale(scale, scale).post_translate(dx, dy);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap_to_rgba(&pixmap))
}

/// Rewrites `fill="..."` and `stroke="..."` values, keeping `none`.
fn recolor(svg: &str, color: &str) -> String {
    let filled = replace_attr(svg, "fill", color);
    replace_attr(&filled, "stroke", color)
}

fn replace_attr(svg: &str, attr: &str, color: &str) -> String {
    let pattern = format!("{attr}=\"");
    let mut out = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(start) = rest.find(&pattern) {
        let value_start = start + pattern.len();
        out.push_str(&rest[..value_start]);
        rest = &rest[value_start..];

        let Some(end) = rest.find('"') else {
            break;
        };
        let value = &rest[..end];
        out.push_str(if value == "none" { value } else { color });
        rest = &rest[end..];
    }

    out.push_str(rest);
    out
}

// ============================================================================
// Pixel conversion
// ============================================================================

/// Copies a straight-alpha image into a premultiplied pixmap.
pub fn rgba_to_pixmap(image: &RgbaImage) -> Result<Pixmap> {
    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(FaviconError::InvalidSize(width))?;

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        let premul = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        // Channels never exceed alpha after premultiplying, so this cannot fail.
        if let Some(color) = PremultipliedColorU8::from_rgba(premul(r), premul(g), premul(b), a) {
            *dst = color;
        }
    }

    Ok(pixmap)
}

/// Copies a premultiplied pixmap back into a straight-alpha image.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());

    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }

    image
}

// ============================================================================
// Compositing
// ============================================================================

/// Draws `src` over `dest` with its top-left corner at `(x, y)`.
///
/// Standard source-over alpha blending; pixels falling outside `dest` are
/// dropped.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i32, y: i32) {
    let (dest_width, dest_height) = (dest.width() as i32, dest.height() as i32);

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x + sx as i32;
        let dy = y + sy as i32;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }

        let dst_pixel = dest.get_pixel_mut(dx as u32, dy as u32);
        *dst_pixel = source_over(*src_pixel, *dst_pixel);
    }
}

fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let out = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        out.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOT: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50"><circle cx="50" cy="25" r="20" fill="#ff0000"/></svg>"##;

    #[test]
    fn glyph_fills_requested_square() {
        let img = render_glyph(&GlyphSource::from_svg(DOT), 40, None).unwrap();
        assert_eq!(img.dimensions(), (40, 40));
        // Wide viewbox is letterboxed vertically.
        assert_eq!(img.get_pixel(20, 1)[3], 0);
        assert!(img.get_pixel(20, 20)[0] > 200);
    }

    #[test]
    fn glyph_recolor() {
        let img = render_glyph(&GlyphSource::from_svg(DOT), 40, Some([0, 255, 0])).unwrap();
        let center = img.get_pixel(20, 20);
        assert!(center[1] > center[0]);
    }

    #[test]
    fn bad_markup_is_an_error() {
        let err = render_glyph(&GlyphSource::from_svg("<svg"), 16, None).unwrap_err();
        assert!(matches!(err, FaviconError::Svg(_)));
    }

    #[cfg(not(feature = "twemoji"))]
    #[test]
    fn emoji_without_feature_is_unresolvable() {
        assert!(GlyphSource::Emoji("🎃".into()).resolve().is_none());
    }

    #[test]
    fn recolor_keeps_none() {
        let out = recolor(r##"<path fill="none" stroke="#000"/>"##, "#123456");
        assert!(out.contains(r#"fill="none""#));
        assert!(out.contains(r##"stroke="#123456""##));
    }

    #[test]
    fn pixmap_conversion_keeps_opaque_pixels() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([10, 200, 30, 255]));
        let back = pixmap_to_rgba(&rgba_to_pixmap(&img).unwrap());
        assert_eq!(back, img);
    }

    #[test]
    fn composite_clips_to_destination() {
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));

        composite_over(&mut dest, &src, 8, -2);

        assert_eq!(dest.get_pixel(9, 0).0, [0, 0, 255, 255]);
        assert_eq!(dest.get_pixel(7, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn composite_half_transparent() {
        let mut dest = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 128]));
        composite_over(&mut dest, &src, 0, 0);
        let p = dest.get_pixel(0, 0);
        assert!(p[0] > 0 && p[2] > 0);
        assert_eq!(p[3], 255);
    }
}
