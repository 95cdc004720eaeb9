//! Multi-size favicon export.
//!
//! One 512px master is scaled to every standard size and encoded. A target
//! that fails is recorded in [`ExportBatch::failures`] and the rest of the
//! batch carries on.

use std::fmt;

use image::ImageFormat;
use tracing::{debug, info, warn};

use crate::animation::{AnimationSpec, generate};
use crate::compositor::{RenderedFavicon, encode};
use crate::error::FaviconError;

/// The standard PNG sizes, in download order.
pub const EXPORT_SIZES: [u32; 6] = [16, 32, 48, 180, 192, 512];

/// Filename of the single master PNG offered alongside animations.
pub const STATIC_FILENAME: &str = "favicon-static.png";

// ============================================================================
// Targets
// ============================================================================

/// Container format of an exported file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Png,
    Ico,
    Svg,
}

impl ArtifactFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Ico => "image/x-icon",
            Self::Svg => "image/svg+xml",
        }
    }
}

/// One file of the standard set, before any prefix is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTarget {
    pub size: u32,
    pub filename: &'static str,
    pub format: ArtifactFormat,
}

impl ExportTarget {
    const fn png(size: u32, filename: &'static str) -> Self {
        Self {
            size,
            filename,
            format: ArtifactFormat::Png,
        }
    }

    /// The filename without its extension.
    pub fn stem(&self) -> &'static str {
        self.filename
            .rsplit_once('.')
            .map_or(self.filename, |(stem, _)| stem)
    }
}

/// The six PNG targets, in [`EXPORT_SIZES`] order.
pub const PNG_TARGETS: [ExportTarget; 6] = [
    ExportTarget::png(16, "favicon-16x16.png"),
    ExportTarget::png(32, "favicon-32x32.png"),
    ExportTarget::png(48, "favicon-48x48.png"),
    ExportTarget::png(180, "apple-touch-icon.png"),
    ExportTarget::png(192, "android-chrome-192x192.png"),
    ExportTarget::png(512, "android-chrome-512x512.png"),
];

/// The legacy icon container, rendered at 32px.
pub const ICO_TARGET: ExportTarget = ExportTarget {
    size: 32,
    filename: "favicon.ico",
    format: ArtifactFormat::Ico,
};

/// Every static target: the six PNGs followed by the ICO.
pub fn static_targets() -> impl Iterator<Item = ExportTarget> {
    PNG_TARGETS.into_iter().chain(std::iter::once(ICO_TARGET))
}

// ============================================================================
// Artifacts
// ============================================================================

/// An encoded file ready to be delivered.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub format: ArtifactFormat,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("filename", &self.filename)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A target that could not be produced.
#[derive(Debug)]
pub struct ExportFailure {
    pub filename: String,
    pub size: u32,
    pub error: FaviconError,
}

/// The result of exporting a set: what was produced and what was skipped.
#[derive(Debug, Default)]
pub struct ExportBatch {
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<ExportFailure>,
}

impl ExportBatch {
    /// Returns true if no target failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.artifacts.iter().map(|a| a.filename.as_str())
    }

    /// Appends another batch, keeping both artifacts and failures.
    pub fn merge(&mut self, other: ExportBatch) {
        self.artifacts.extend(other.artifacts);
        self.failures.extend(other.failures);
    }

    /// Records every animated target as failed because the animation itself
    /// could not be built.
    pub(crate) fn fail_animated(&mut self, prefix: &str, cause: &FaviconError) {
        for target in PNG_TARGETS {
            let filename = animated_filename(prefix, target);
            let error = FaviconError::Encode {
                format: "svg",
                reason: cause.to_string(),
            };
            self.record(filename, target.size, Err(error));
        }
    }

    fn record(&mut self, filename: String, size: u32, result: crate::error::Result<Artifact>) {
        match result {
            Ok(artifact) => {
                debug!(filename = %artifact.filename, bytes = artifact.bytes.len(), "encoded artifact");
                self.artifacts.push(artifact);
            }
            Err(error) => {
                warn!(%filename, size, %error, "skipping export target");
                self.failures.push(ExportFailure {
                    filename,
                    size,
                    error,
                });
            }
        }
    }
}

// ============================================================================
// Export
// ============================================================================

/// Exports the six PNGs and the ICO from one master favicon.
///
/// `prefix` is prepended to every filename (the seasonal theme name plus a
/// hyphen, or empty).
pub fn export_static(favicon: &RenderedFavicon, prefix: &str) -> ExportBatch {
    export_targets(favicon, static_targets(), prefix)
}

/// Exports an arbitrary list of raster targets from one master favicon.
pub fn export_targets(
    favicon: &RenderedFavicon,
    targets: impl IntoIterator<Item = ExportTarget>,
    prefix: &str,
) -> ExportBatch {
    let mut batch = ExportBatch::default();

    for target in targets {
        let filename = format!("{prefix}{}", target.filename);
        let result = encode_target(favicon, target).map(|bytes| Artifact {
            filename: filename.clone(),
            format: target.format,
            bytes,
        });
        batch.record(filename, target.size, result);
    }

    info!(
        produced = batch.artifacts.len(),
        failed = batch.failures.len(),
        prefix,
        "raster export finished"
    );
    batch
}

fn encode_target(favicon: &RenderedFavicon, target: ExportTarget) -> crate::error::Result<Vec<u8>> {
    let image = favicon.resized(target.size)?;
    let format = match target.format {
        ArtifactFormat::Png => ImageFormat::Png,
        ArtifactFormat::Ico => ImageFormat::Ico,
        ArtifactFormat::Svg => {
            return Err(FaviconError::Encode {
                format: "svg",
                reason: "raster targets cannot be svg".into(),
            });
        }
    };
    encode(&image, format)
}

/// Exports one animated SVG per standard size.
///
/// Files are named `animated-{prefix}{stem}.svg` after the matching PNG.
pub fn export_animated(spec: &AnimationSpec, prefix: &str) -> ExportBatch {
    let mut batch = ExportBatch::default();

    for target in PNG_TARGETS {
        let filename = animated_filename(prefix, target);
        let result = generate(spec, target.size).map(|svg| Artifact {
            filename: filename.clone(),
            format: ArtifactFormat::Svg,
            bytes: svg.into_string().into_bytes(),
        });
        batch.record(filename, target.size, result);
    }

    info!(
        produced = batch.artifacts.len(),
        failed = batch.failures.len(),
        kind = %spec.kind,
        "animated export finished"
    );
    batch
}

fn animated_filename(prefix: &str, target: ExportTarget) -> String {
    format!("animated-{prefix}{}.svg", target.stem())
}

/// The master PNG as a single download, used as the static fallback for
/// animated favicons.
pub fn static_artifact(favicon: &RenderedFavicon) -> crate::error::Result<Artifact> {
    Ok(Artifact {
        filename: STATIC_FILENAME.to_string(),
        format: ArtifactFormat::Png,
        bytes: favicon.to_png()?,
    })
}

/// The `<link>` tags that reference an exported static set.
pub fn html_snippet(prefix: &str) -> String {
    let mut lines = vec![format!(
        r#"<link rel="icon" href="/{prefix}{}" sizes="{size}x{size}">"#,
        ICO_TARGET.filename,
        size = ICO_TARGET.size
    )];

    for target in PNG_TARGETS {
        let href = format!("/{prefix}{}", target.filename);
        let line = if target.size == 180 {
            format!(r#"<link rel="apple-touch-icon" href="{href}">"#)
        } else {
            format!(
                r#"<link rel="icon" type="image/png" sizes="{size}x{size}" href="{href}">"#,
                size = target.size
            )
        };
        lines.push(line);
    }

    lines.join("\n")
}
