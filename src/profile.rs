//! Serializable effect profile.
//!
//! An [`EffectProfile`] captures every effect toggle in a format that can be
//! serialized to JSON and handed between the editor UI, the CLI and the wasm
//! binding. Geometry (crop and pan/zoom) is not part of a profile.
//!
//! # Example
//!
//! ```
//! use favicraft::{BlendMode, ColorOverlaySettings, EffectProfile, SeasonalTheme};
//!
//! let profile = EffectProfile::new()
//!     .with_color_overlay(ColorOverlaySettings {
//!         enabled: true,
//!         color: "#ff6f00".into(),
//!         opacity: 0.4,
//!         blend_mode: BlendMode::Overlay,
//!     })
//!     .with_seasonal(SeasonalTheme::Halloween);
//!
//! let json = profile.to_json().unwrap();
//! let restored = EffectProfile::from_json(&json).unwrap();
//! assert_eq!(restored.seasonal, Some(SeasonalTheme::Halloween));
//! ```

use serde::{Deserialize, Serialize};

use crate::layer::blend::{parse_hex, to_hex};
use crate::layer::color_overlay::clamp_opacity;
use crate::layer::{BlendMode, ColorOverlayConfig, SeasonalTheme};
use crate::error::Result;

// ============================================================================
// Color Overlay Settings
// ============================================================================

/// Serializable settings for the color overlay layer.
///
/// ```json
/// { "enabled": true, "color": "#000000", "opacity": 0.5, "blendMode": "multiply" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct ColorOverlaySettings {
    #[serde(default)]
    pub enabled: bool,

    /// Hex color, `#rrggbb`.
    #[serde(default = "default_color")]
    pub color: String,

    /// Opacity, clamped to 0.0-1.0 when applied.
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    #[serde(default)]
    pub blend_mode: BlendMode,
}

impl Default for ColorOverlaySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            color: default_color(),
            opacity: default_opacity(),
            blend_mode: BlendMode::default(),
        }
    }
}

impl ColorOverlaySettings {
    /// Builds the layer config. Fails on a malformed color.
    pub fn to_config(&self) -> Result<ColorOverlayConfig> {
        let color = parse_hex(&self.color)?;
        Ok(ColorOverlayConfig::new(color, self.opacity, self.blend_mode))
    }

    /// Captures a layer config.
    pub fn from_config(config: &ColorOverlayConfig, enabled: bool) -> Self {
        Self {
            enabled,
            color: to_hex(config.color),
            opacity: clamp_opacity(config.opacity),
            blend_mode: config.blend_mode,
        }
    }
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_opacity() -> f32 {
    0.5
}

// ============================================================================
// EffectProfile
// ============================================================================

/// A serializable profile containing all effect settings.
///
/// # JSON Format
///
/// ```json
/// {
///   "removeBackground": false,
///   "colorOverlay": {
///     "enabled": true,
///     "color": "#e91e63",
///     "opacity": 0.35,
///     "blendMode": "soft-light"
///   },
///   "seasonal": "valentine"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "tsify", derive(tsify_next::Tsify))]
pub struct EffectProfile {
    #[serde(default)]
    pub remove_background: bool,

    #[serde(default)]
    pub color_overlay: ColorOverlaySettings,

    /// `None` means no seasonal effect.
    #[serde(default)]
    pub seasonal: Option<SeasonalTheme>,
}

impl EffectProfile {
    /// Creates a profile with every effect off.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background_removal(mut self, enabled: bool) -> Self {
        self.remove_background = enabled;
        self
    }

    pub fn with_color_overlay(mut self, settings: ColorOverlaySettings) -> Self {
        self.color_overlay = settings;
        self
    }

    pub fn with_seasonal(mut self, theme: SeasonalTheme) -> Self {
        self.seasonal = Some(theme);
        self
    }

    /// Filename prefix for exported artifacts: the theme name plus a hyphen,
    /// or empty.
    pub fn file_prefix(&self) -> String {
        self.seasonal.map(SeasonalTheme::file_prefix).unwrap_or_default()
    }

    /// Serializes the profile to a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the profile to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes a profile from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaviconError;

    #[test]
    fn empty_profile_deserializes() {
        let profile = EffectProfile::from_json("{}").unwrap();

        assert!(!profile.remove_background);
        assert!(!profile.color_overlay.enabled);
        assert_eq!(profile.color_overlay.color, "#000000");
        assert_eq!(profile.color_overlay.opacity, 0.5);
        assert_eq!(profile.color_overlay.blend_mode, BlendMode::Multiply);
        assert_eq!(profile.seasonal, None);
    }

    #[test]
    fn profile_json_format() {
        let profile = EffectProfile::new()
            .with_background_removal(true)
            .with_seasonal(SeasonalTheme::Celebration);

        let json = profile.to_json_pretty().unwrap();

        assert!(json.contains("\"removeBackground\": true"));
        assert!(json.contains("\"colorOverlay\""));
        assert!(json.contains("\"blendMode\": \"multiply\""));
        assert!(json.contains("\"seasonal\": \"celebration\""));
    }

    #[test]
    fn profile_serialization_roundtrip() {
        let profile = EffectProfile::new().with_color_overlay(ColorOverlaySettings {
            enabled: true,
            color: "#4a90e2".into(),
            opacity: 0.25,
            blend_mode: BlendMode::ColorBurn,
        });

        let restored = EffectProfile::from_json(&profile.to_json().unwrap()).unwrap();
        assert_eq!(restored, profile);
    }

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(EffectProfile::from_json(r#"{"seasonal":"easter"}"#).is_err());
    }

    #[test]
    fn settings_to_config_clamps_opacity() {
        let settings = ColorOverlaySettings {
            enabled: true,
            color: "#FF0000".into(),
            opacity: 1.5,
            blend_mode: BlendMode::Overlay,
        };
        let config = settings.to_config().unwrap();
        assert_eq!(config.opacity, 1.0);
        assert_eq!(config.color.red, 255);

        let back = ColorOverlaySettings::from_config(&config, true);
        assert_eq!(back.color, "#ff0000");
        assert_eq!(back.opacity, 1.0);
    }

    #[test]
    fn malformed_color_is_an_error() {
        let settings = ColorOverlaySettings {
            color: "tomato".into(),
            ..Default::default()
        };
        assert!(matches!(
            settings.to_config(),
            Err(FaviconError::InvalidColor(_))
        ));
    }

    #[test]
    fn prefix_follows_theme() {
        assert_eq!(EffectProfile::new().file_prefix(), "");
        assert_eq!(
            EffectProfile::new()
                .with_seasonal(SeasonalTheme::Snow)
                .file_prefix(),
            "snow-"
        );
    }
}
