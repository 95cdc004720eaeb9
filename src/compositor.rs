//! Favicon compositing engine.
//!
//! Maps the on-screen crop back into source pixels, draws that region into a
//! square canvas and runs the canvas through the effect [`LayerPipeline`].

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use tracing::debug;

use crate::error::{FaviconError, Result};
use crate::geometry::{CropSpec, DisplaySize, SourceRegion, TransformSpec};
use crate::layer::{BackgroundRemovalConfig, LayerPipeline, SeasonalConfig};
use crate::profile::{ColorOverlaySettings, EffectProfile};
use crate::source::SourceImage;

/// Side length of the live preview.
pub const PREVIEW_SIZE: u32 = 64;

/// Side length of the master image every export is scaled from.
pub const EXPORT_SIZE: u32 = 512;

// ============================================================================
// Configurable Trait
// ============================================================================

/// Trait for types that can be configured from an [`EffectProfile`].
pub trait Configurable {
    /// Applies a profile's settings to this instance.
    fn apply_profile(&mut self, profile: &EffectProfile) -> Result<()>;

    /// Exports the current settings as a profile.
    fn export_profile(&self) -> EffectProfile;
}

// ============================================================================
// RenderedFavicon
// ============================================================================

/// A finished square raster.
///
/// Never mutated in place: any input change produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFavicon {
    image: RgbaImage,
}

impl RenderedFavicon {
    /// Wraps a raster. Fails if it is empty or not square.
    pub fn new(image: RgbaImage) -> Result<Self> {
        let (w, h) = image.dimensions();
        if w == 0 || w != h {
            return Err(FaviconError::InvalidSize(w.max(h)));
        }
        Ok(Self { image })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Scales the favicon to `size x size`.
    pub fn resized(&self, size: u32) -> Result<RgbaImage> {
        if size == 0 {
            return Err(FaviconError::InvalidSize(size));
        }
        if size == self.size() {
            return Ok(self.image.clone());
        }
        Ok(imageops::resize(&self.image, size, size, FilterType::Lanczos3))
    }

    /// Encodes the favicon as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode(&self.image, ImageFormat::Png)
    }

    /// Encodes the favicon as a `data:image/png;base64,...` URL.
    pub fn to_data_url(&self) -> Result<String> {
        let png = self.to_png()?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

/// Encodes `image` in a lossless container.
pub(crate) fn encode(image: &RgbaImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|e| FaviconError::Encode {
            format: format_name(format),
            reason: e.to_string(),
        })?;
    Ok(buffer)
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Ico => "ico",
        _ => "image",
    }
}

// ============================================================================
// FaviconCompositor
// ============================================================================

/// Renders favicons from one source image.
///
/// Configure effects through the [`pipeline`](Self::pipeline) field or with a
/// profile via [`Configurable`].
///
/// # Example
///
/// ```
/// use favicraft::{CropSpec, DisplaySize, FaviconCompositor, SourceImage, TransformSpec};
/// use image::{Rgba, RgbaImage};
///
/// let source = SourceImage::from_raster(RgbaImage::from_pixel(100, 80, Rgba([9, 9, 9, 255])));
/// let compositor = FaviconCompositor::new(source);
///
/// let display = DisplaySize::natural(100, 80);
/// let favicon = compositor
///     .render(&CropSpec::centered_default(display), &TransformSpec::identity(), display, 64)
///     .unwrap();
/// assert_eq!(favicon.size(), 64);
/// ```
pub struct FaviconCompositor {
    source: SourceImage,

    /// The effect layers. Access them directly to configure.
    pub pipeline: LayerPipeline,

    background_tolerance: f32,
}

impl FaviconCompositor {
    pub fn new(source: SourceImage) -> Self {
        Self {
            source,
            pipeline: LayerPipeline::default(),
            background_tolerance: BackgroundRemovalConfig::default().tolerance,
        }
    }

    /// Sets the tolerance used when a profile turns background removal on.
    pub fn with_background_tolerance(mut self, tolerance: f32) -> Self {
        self.background_tolerance = BackgroundRemovalConfig::new(tolerance).tolerance;
        self
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Renders an `output_size x output_size` favicon.
    ///
    /// Fails with [`FaviconError::EmptyCrop`] if the crop has no area.
    pub fn render(
        &self,
        crop: &CropSpec,
        transform: &TransformSpec,
        display: DisplaySize,
        output_size: u32,
    ) -> Result<RenderedFavicon> {
        if crop.is_empty() {
            return Err(FaviconError::EmptyCrop {
                width: crop.width,
                height: crop.height,
            });
        }
        if output_size == 0 {
            return Err(FaviconError::InvalidSize(output_size));
        }
        let usable = |side: f32| side.is_finite() && side > 0.0;
        if !(usable(display.width) && usable(display.height)) {
            return Err(FaviconError::InvalidSize(0));
        }

        let (natural_w, natural_h) = self.source.natural_size();
        let region = SourceRegion::map(crop, transform, display, natural_w, natural_h);
        debug!(
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            output_size,
            "mapped crop to source region"
        );

        let canvas = self.source.draw_region(&region, output_size);
        RenderedFavicon::new(self.pipeline.render(canvas)?)
    }
}

impl Configurable for FaviconCompositor {
    /// Applies a profile's settings to the layers.
    ///
    /// Fails without touching any layer if the overlay color is malformed.
    fn apply_profile(&mut self, profile: &EffectProfile) -> Result<()> {
        let color = profile.color_overlay.to_config()?;

        // Background
        let background = profile
            .remove_background
            .then(|| BackgroundRemovalConfig::new(self.background_tolerance));
        self.pipeline.background.set_config(background);
        self.pipeline.background.set_enabled(true);

        // Color overlay
        self.pipeline.color.set_config(Some(color));
        self.pipeline
            .color
            .set_enabled(profile.color_overlay.enabled);

        // Seasonal
        self.pipeline
            .seasonal
            .set_config(profile.seasonal.map(SeasonalConfig::new));
        self.pipeline.seasonal.set_enabled(true);

        Ok(())
    }

    fn export_profile(&self) -> EffectProfile {
        let color_overlay = match self.pipeline.color.config() {
            Some(config) => {
                ColorOverlaySettings::from_config(config, self.pipeline.color.is_enabled())
            }
            None => ColorOverlaySettings::default(),
        };

        EffectProfile {
            remove_background: self.pipeline.background.is_active(),
            color_overlay,
            seasonal: self.pipeline.seasonal_theme(),
        }
    }
}

/// Renders a favicon from value inputs.
///
/// A pure function of its arguments: identical inputs give identical pixels.
pub fn render(
    source: &SourceImage,
    crop: &CropSpec,
    transform: &TransformSpec,
    display: DisplaySize,
    effects: &EffectProfile,
    output_size: u32,
) -> Result<RenderedFavicon> {
    let mut compositor = FaviconCompositor::new(source.clone());
    compositor.apply_profile(effects)?;
    compositor.render(crop, transform, display, output_size)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{BlendMode, SeasonalTheme};
    use image::Rgba;

    /// Left half red, right half blue.
    fn split_source(width: u32, height: u32) -> SourceImage {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        SourceImage::from_raster(img)
    }

    #[test]
    fn output_is_square_for_any_aspect() {
        for (w, h) in [(300, 100), (100, 300), (64, 64)] {
            let compositor = FaviconCompositor::new(split_source(w, h));
            let display = DisplaySize::natural(w, h);
            let crop = CropSpec::centered_default(display);
            for size in [PREVIEW_SIZE, 37] {
                let out = compositor
                    .render(&crop, &TransformSpec::identity(), display, size)
                    .unwrap();
                assert_eq!(out.image().dimensions(), (size, size));
            }
        }
    }

    #[test]
    fn empty_crop_is_rejected() {
        let compositor = FaviconCompositor::new(split_source(10, 10));
        let err = compositor
            .render(
                &CropSpec::square(2.0, 2.0, 0.0),
                &TransformSpec::identity(),
                DisplaySize::natural(10, 10),
                16,
            )
            .unwrap_err();
        assert!(matches!(err, FaviconError::EmptyCrop { .. }));
    }

    #[test]
    fn degenerate_display_is_rejected() {
        let compositor = FaviconCompositor::new(split_source(10, 10));
        for display in [
            DisplaySize::new(f32::NAN, 10.0),
            DisplaySize::new(10.0, f32::NAN),
            DisplaySize::new(0.0, 10.0),
            DisplaySize::new(f32::INFINITY, 10.0),
        ] {
            let err = compositor
                .render(&CropSpec::square(0.0, 0.0, 5.0), &TransformSpec::identity(), display, 16)
                .unwrap_err();
            assert!(matches!(err, FaviconError::InvalidSize(_)), "{display:?}");
        }
    }

    #[test]
    fn nan_crop_is_empty() {
        let compositor = FaviconCompositor::new(split_source(10, 10));
        let err = compositor
            .render(
                &CropSpec::square(0.0, 0.0, f32::NAN),
                &TransformSpec::identity(),
                DisplaySize::natural(10, 10),
                16,
            )
            .unwrap_err();
        assert!(matches!(err, FaviconError::EmptyCrop { .. }));
    }

    #[test]
    fn crop_selects_left_half() {
        let compositor = FaviconCompositor::new(split_source(200, 100));
        let out = compositor
            .render(
                &CropSpec::square(0.0, 0.0, 100.0),
                &TransformSpec::identity(),
                DisplaySize::natural(200, 100),
                32,
            )
            .unwrap();
        assert!(out.image().pixels().all(|p| p.0 == [255, 0, 0, 255]));
    }

    #[test]
    fn scaled_display_maps_back_to_natural_pixels() {
        // Displayed at half size: the right half starts at x = 50 on screen.
        let compositor = FaviconCompositor::new(split_source(200, 100));
        let out = compositor
            .render(
                &CropSpec::square(50.0, 0.0, 50.0),
                &TransformSpec::identity(),
                DisplaySize::new(100.0, 50.0),
                16,
            )
            .unwrap();
        assert!(out.image().pixels().all(|p| p.0 == [0, 0, 255, 255]));
    }

    #[test]
    fn render_is_deterministic() {
        let source = split_source(120, 90);
        let display = DisplaySize::natural(120, 90);
        let crop = CropSpec::centered_default(display);
        let transform = TransformSpec::new(1.5, -10.0, 4.0);
        let effects = EffectProfile::new()
            .with_background_removal(true)
            .with_color_overlay(ColorOverlaySettings {
                enabled: true,
                color: "#336699".into(),
                opacity: 0.6,
                blend_mode: BlendMode::SoftLight,
            })
            .with_seasonal(SeasonalTheme::Snow);

        let a = render(&source, &crop, &transform, display, &effects, 96).unwrap();
        let b = render(&source, &crop, &transform, display, &effects, 96).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_png().unwrap(), b.to_png().unwrap());
    }

    #[test]
    fn disabled_overlay_leaves_pixels() {
        let source = split_source(40, 40);
        let display = DisplaySize::natural(40, 40);
        let crop = CropSpec::square(0.0, 0.0, 20.0);
        let effects = EffectProfile::new().with_color_overlay(ColorOverlaySettings {
            enabled: false,
            color: "#00ff00".into(),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
        });

        let out = render(&source, &crop, &TransformSpec::identity(), display, &effects, 8).unwrap();
        assert_eq!(out.image().get_pixel(4, 4).0, [255, 0, 0, 255]);
    }

    #[test]
    fn profile_round_trips_through_compositor() {
        let profile = EffectProfile::new()
            .with_background_removal(true)
            .with_color_overlay(ColorOverlaySettings {
                enabled: false,
                color: "#e91e63".into(),
                opacity: 0.35,
                blend_mode: BlendMode::HardLight,
            })
            .with_seasonal(SeasonalTheme::Valentine);

        let mut compositor = FaviconCompositor::new(split_source(10, 10));
        compositor.apply_profile(&profile).unwrap();

        assert!(compositor.pipeline.background.is_active());
        assert!(compositor.pipeline.color.has_config());
        assert!(!compositor.pipeline.color.is_active());
        assert_eq!(compositor.export_profile(), profile);
    }

    #[test]
    fn bad_profile_leaves_layers_untouched() {
        let mut compositor = FaviconCompositor::new(split_source(10, 10));
        compositor
            .apply_profile(&EffectProfile::new().with_seasonal(SeasonalTheme::Snow))
            .unwrap();

        let bad = EffectProfile {
            color_overlay: ColorOverlaySettings {
                color: "nope".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(compositor.apply_profile(&bad).is_err());
        assert_eq!(compositor.pipeline.seasonal_theme(), Some(SeasonalTheme::Snow));
    }

    #[test]
    fn data_url_is_base64_png() {
        let favicon = RenderedFavicon::new(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]))).unwrap();
        let url = favicon.to_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn rendered_favicon_must_be_square() {
        assert!(RenderedFavicon::new(RgbaImage::new(4, 3)).is_err());
        assert!(RenderedFavicon::new(RgbaImage::new(0, 0)).is_err());
    }

    #[test]
    fn resized_scales_master() {
        let favicon = RenderedFavicon::new(RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 255]))).unwrap();
        let small = favicon.resized(16).unwrap();
        assert_eq!(small.dimensions(), (16, 16));
        let p = small.get_pixel(8, 8).0;
        for (got, want) in p.iter().zip([10u8, 20, 30, 255]) {
            assert!(got.abs_diff(want) <= 1, "got {p:?}");
        }
        assert!(favicon.resized(0).is_err());
    }
}
