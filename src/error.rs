//! Error types for rendering, export and gallery persistence.

use thiserror::Error;

/// Errors raised while decoding, rendering or exporting a favicon.
#[derive(Debug, Error)]
pub enum FaviconError {
    /// The source bytes could not be decoded into a raster.
    #[error("failed to decode source image: {0}")]
    ImageDecode(String),

    /// The crop rectangle has no area.
    #[error("crop area is empty ({width}x{height})")]
    EmptyCrop { width: f32, height: f32 },

    /// An output image could not be encoded.
    #[error("failed to encode {format}: {reason}")]
    Encode { format: &'static str, reason: String },

    /// A color string was not a `#rrggbb` hex value.
    #[error("invalid color `{0}`")]
    InvalidColor(String),

    /// A zero or otherwise unusable pixel size was requested.
    #[error("invalid output size {0}")]
    InvalidSize(u32),

    /// An SVG glyph could not be parsed or rasterized.
    #[error("svg rendering failed: {0}")]
    Svg(String),

    /// The editor was asked to do something its current step does not allow.
    #[error("cannot {action} while in the {step} step")]
    InvalidTransition {
        action: &'static str,
        step: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for FaviconError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Decoding(e) => Self::ImageDecode(e.to_string()),
            image::ImageError::Unsupported(e) => Self::ImageDecode(e.to_string()),
            image::ImageError::IoError(e) => Self::Io(e),
            other => Self::Encode {
                format: "image",
                reason: other.to_string(),
            },
        }
    }
}

/// Errors raised by the gallery submission store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// No submission exists with the given id.
    #[error("submission {id} not found")]
    NotFound { id: i64 },

    /// A required submission field was missing or blank.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("database error: {0}")]
    Database(String),
}

#[cfg(feature = "gallery")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FaviconError>;
