//! Decoded source images and region sampling.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::{FaviconError, Result};
use crate::geometry::SourceRegion;

/// A decoded user-supplied image.
///
/// Immutable once loaded. The raw bytes are kept alongside the raster so the
/// original file can be re-offered without re-encoding. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Arc<[u8]>,
    raster: Arc<RgbaImage>,
}

impl SourceImage {
    /// Decodes raw file bytes into an RGBA raster.
    ///
    /// Fails with [`FaviconError::ImageDecode`] if the bytes are not a
    /// supported image or decode to an empty raster.
    pub fn decode(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        let bytes = bytes.into();
        let raster = image::load_from_memory(&bytes)
            .map_err(|e| FaviconError::ImageDecode(e.to_string()))?
            .to_rgba8();

        if raster.width() == 0 || raster.height() == 0 {
            return Err(FaviconError::ImageDecode("image has no pixels".into()));
        }

        debug!(
            width = raster.width(),
            height = raster.height(),
            bytes = bytes.len(),
            "decoded source image"
        );

        Ok(Self {
            bytes,
            raster: Arc::new(raster),
        })
    }

    /// Wraps an already decoded raster. Used by tests and the wasm binding.
    pub fn from_raster(raster: RgbaImage) -> Self {
        Self {
            bytes: Arc::from(Vec::new()),
            raster: Arc::new(raster),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Returns the natural `(width, height)` of the image.
    pub fn natural_size(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// Draws `region` of the source into a new `size x size` canvas.
    ///
    /// Each output pixel samples the source at its center with bilinear
    /// filtering in premultiplied space. Parts of the region that fall outside
    /// the image stay transparent.
    pub fn draw_region(&self, region: &SourceRegion, size: u32) -> RgbaImage {
        let mut out = RgbaImage::new(size, size);
        if region.width <= 0.0 || region.height <= 0.0 {
            return out;
        }

        let step_x = region.width / size as f32;
        let step_y = region.height / size as f32;

        for (px, py, pixel) in out.enumerate_pixels_mut() {
            let u = region.x + (px as f32 + 0.5) * step_x;
            let v = region.y + (py as f32 + 0.5) * step_y;
            *pixel = self.sample(u, v);
        }

        out
    }

    fn sample(&self, u: f32, v: f32) -> Rgba<u8> {
        let img = &*self.raster;
        let (w, h) = img.dimensions();
        if u < 0.0 || v < 0.0 || u >= w as f32 || v >= h as f32 {
            return Rgba([0, 0, 0, 0]);
        }

        let fx = u - 0.5;
        let fy = v - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let clamp_x = |x: f32| x.clamp(0.0, (w - 1) as f32) as u32;
        let clamp_y = |y: f32| y.clamp(0.0, (h - 1) as f32) as u32;
        let (xa, xb) = (clamp_x(x0), clamp_x(x0 + 1.0));
        let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

        let taps = [
            (img.get_pixel(xa, ya), (1.0 - tx) * (1.0 - ty)),
            (img.get_pixel(xb, ya), tx * (1.0 - ty)),
            (img.get_pixel(xa, yb), (1.0 - tx) * ty),
            (img.get_pixel(xb, yb), tx * ty),
        ];

        let mut acc = [0.0f32; 4];
        for (p, weight) in taps {
            let a = p[3] as f32 / 255.0 * weight;
            acc[0] += p[0] as f32 * a;
            acc[1] += p[1] as f32 * a;
            acc[2] += p[2] as f32 * a;
            acc[3] += a;
        }

        if acc[3] <= f32::EPSILON {
            return Rgba([0, 0, 0, 0]);
        }

        let channel = |c: f32| (c / acc[3]).round().clamp(0.0, 255.0) as u8;
        Rgba([
            channel(acc[0]),
            channel(acc[1]),
            channel(acc[2]),
            (acc[3] * 255.0).round().clamp(0.0, 255.0) as u8,
        ])
    }
}
