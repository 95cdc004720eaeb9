//! favicraft: favicon generation library
//!
//! This crate turns an uploaded image into a standard favicon set: crop and
//! pan/zoom a source image, apply optional effects (background removal, a
//! blended color overlay, a seasonal theme), then export PNGs at every
//! standard size, an ICO and optionally animated SVGs.
//!
//! # Example
//!
//! ```
//! use favicraft::{
//!     CropSpec, DisplaySize, EffectProfile, SeasonalTheme, SourceImage, TransformSpec,
//!     export, render,
//! };
//! use image::{Rgba, RgbaImage};
//!
//! let source = SourceImage::from_raster(RgbaImage::from_pixel(200, 160, Rgba([40, 90, 200, 255])));
//! let display = DisplaySize::natural(200, 160);
//! let effects = EffectProfile::new().with_seasonal(SeasonalTheme::Halloween);
//!
//! let favicon = render(
//!     &source,
//!     &CropSpec::centered_default(display),
//!     &TransformSpec::identity(),
//!     display,
//!     &effects,
//!     512,
//! )
//! .unwrap();
//!
//! let batch = export::export_static(&favicon, &effects.file_prefix());
//! assert!(batch.filenames().any(|f| f == "halloween-favicon.ico"));
//! ```
//!
//! # Editing Flow
//!
//! [`EditorSession`] drives the `upload → crop → results` flow, including
//! stale-decode handling and cancellation of pending deliveries on reset.

pub mod animation;
pub mod compositor;
pub mod config;
pub mod delivery;
pub mod error;
pub mod export;
pub mod gallery;
pub mod geometry;
pub mod layer;
pub mod profile;
pub mod session;
pub mod source;

#[cfg(feature = "tsify")]
pub mod wasm;

pub use animation::{AnimationKind, AnimationSpec, SvgDocument, generate};
pub use compositor::{
    Configurable, EXPORT_SIZE, FaviconCompositor, PREVIEW_SIZE, RenderedFavicon, render,
};
pub use config::GeneratorConfig;
pub use delivery::{
    DeliveryHandle, DeliveryReport, DirectorySink, DownloadSink, MemorySink, StaggeredDelivery,
};
pub use error::{FaviconError, PersistenceError, Result};
pub use export::{Artifact, ArtifactFormat, EXPORT_SIZES, ExportBatch, ExportFailure, ExportTarget};
pub use gallery::{Counter, GalleryCard, NewSubmission, Submission, SubmissionStore};
#[cfg(feature = "gallery")]
pub use gallery::SqliteStore;
pub use geometry::{CropSpec, DisplaySize, SourceRegion, TransformSpec};
pub use layer::{
    BackgroundRemovalConfig, BlendMode, ColorOverlayConfig, GlyphSource, Layer, LayerConfig,
    LayerEffect, LayerPipeline, RenderContext, SeasonalConfig, SeasonalTheme,
};
pub use profile::{ColorOverlaySettings, EffectProfile};
pub use session::{DecodeTicket, EditorSession, EditorStep, ExportChoice};
pub use source::SourceImage;

#[cfg(feature = "tsify")]
pub use wasm::FaviconStudio;
