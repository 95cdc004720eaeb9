//! Animated SVG favicons.
//!
//! An animated favicon is an SVG document that inlines the rendered PNG and
//! carries a CSS `@keyframes` block. Every document is self-contained, so it
//! can be hosted on its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compositor::RenderedFavicon;
use crate::error::{FaviconError, Result};

/// Shortest accepted cycle, in seconds.
pub const MIN_SPEED: f32 = 0.5;

/// Longest accepted cycle, in seconds.
pub const MAX_SPEED: f32 = 5.0;

pub const DEFAULT_SPEED: f32 = 2.0;

/// The motion applied to the favicon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum AnimationKind {
    /// Scale 1 to 1.1 and back, fading to 0.8 opacity at the peak.
    #[default]
    Pulse,
    /// One full turn per cycle.
    Rotate,
}

impl AnimationKind {
    pub const ALL: [AnimationKind; 2] = [Self::Pulse, Self::Rotate];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pulse => "pulse",
            Self::Rotate => "rotate",
        }
    }

    fn timing_function(self) -> &'static str {
        match self {
            Self::Pulse => "ease-in-out",
            Self::Rotate => "linear",
        }
    }

    fn keyframes(self) -> &'static str {
        match self {
            Self::Pulse => PULSE_KEYFRAMES,
            Self::Rotate => ROTATE_KEYFRAMES,
        }
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown animation `{s}`"))
    }
}

const PULSE_KEYFRAMES: &str = "\
        @keyframes pulse {
          0%, 100% {
            transform: scale(1);
            opacity: 1;
          }
          50% {
            transform: scale(1.1);
            opacity: 0.8;
          }
        }";

const ROTATE_KEYFRAMES: &str = "\
        @keyframes rotate {
          from {
            transform: rotate(0deg);
          }
          to {
            transform: rotate(360deg);
          }
        }";

/// What to animate and how fast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSpec {
    pub kind: AnimationKind,

    #[serde(deserialize_with = "deserialize_speed")]
    speed_seconds: f32,

    /// The rendered favicon as a `data:` URL.
    base_image: String,
}

impl AnimationSpec {
    /// Builds a spec around a rendered favicon. The speed is clamped to
    /// `[0.5, 5]` seconds.
    pub fn new(kind: AnimationKind, speed_seconds: f32, favicon: &RenderedFavicon) -> Result<Self> {
        Ok(Self::from_image_data(kind, speed_seconds, favicon.to_data_url()?))
    }

    /// Builds a spec around already encoded image data. Bare base64 is
    /// treated as PNG.
    pub fn from_image_data(kind: AnimationKind, speed_seconds: f32, data: impl Into<String>) -> Self {
        let data = data.into();
        let base_image = if data.starts_with("data:") {
            data
        } else {
            format!("data:image/png;base64,{data}")
        };

        Self {
            kind,
            speed_seconds: clamp_speed(speed_seconds),
            base_image,
        }
    }

    pub fn speed_seconds(&self) -> f32 {
        self.speed_seconds
    }

    pub fn set_speed(&mut self, speed_seconds: f32) {
        self.speed_seconds = clamp_speed(speed_seconds);
    }

    pub fn base_image(&self) -> &str {
        &self.base_image
    }

    /// The CSS duration token, e.g. `2s` or `0.5s`.
    pub fn duration(&self) -> String {
        format!("{}s", self.speed_seconds)
    }
}

fn deserialize_speed<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f32::deserialize(deserializer).map(clamp_speed)
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_nan() {
        DEFAULT_SPEED
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

/// A complete SVG document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgDocument(String);

impl SvgDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SvgDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates the animated SVG for one output size.
pub fn generate(spec: &AnimationSpec, size: u32) -> Result<SvgDocument> {
    if size == 0 {
        return Err(FaviconError::InvalidSize(size));
    }

    let kind = spec.kind;
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {size} {size}" width="{size}" height="{size}">
  <defs>
    <style>
      <![CDATA[
        .animated-favicon {{
          animation: {name} {duration} {timing} infinite;
          transform-origin: center;
          transform-box: fill-box;
        }}

{keyframes}
      ]]>
    </style>
  </defs>

  <image x="0" y="0" width="{size}" height="{size}" xlink:href="{href}" href="{href}" class="animated-favicon" />
</svg>"#,
        name = kind.as_str(),
        duration = spec.duration(),
        timing = kind.timing_function(),
        keyframes = kind.keyframes(),
        href = escape_attr(&spec.base_image),
    );

    Ok(SvgDocument(svg))
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: AnimationKind, speed: f32) -> AnimationSpec {
        AnimationSpec::from_image_data(kind, speed, "iVBORw0KGgo=")
    }

    #[test]
    fn pulse_document() {
        let svg = generate(&spec(AnimationKind::Pulse, 2.0), 32).unwrap();
        let text = svg.as_str();

        assert!(text.starts_with("<svg"));
        assert!(text.contains(r#"viewBox="0 0 32 32""#));
        assert!(text.contains("animation: pulse 2s ease-in-out infinite;"));
        assert!(text.contains("transform: scale(1);"));
        assert!(text.contains("transform: scale(1.1);"));
        assert!(text.contains("opacity: 0.8;"));
        assert!(text.contains("transform-origin: center;"));
        assert!(!text.contains("@keyframes rotate"));
    }

    #[test]
    fn rotate_document() {
        let svg = generate(&spec(AnimationKind::Rotate, 1.0), 180).unwrap();
        let text = svg.as_str();

        assert!(text.contains("animation: rotate 1s linear infinite;"));
        assert!(text.contains("rotate(0deg)"));
        assert!(text.contains("rotate(360deg)"));
        assert!(text.contains(r#"width="180" height="180""#));
        assert!(!text.contains("@keyframes pulse"));
    }

    #[test]
    fn image_is_inlined() {
        let svg = generate(&spec(AnimationKind::Pulse, 2.0), 16).unwrap();
        assert!(svg
            .as_str()
            .contains(r#"xlink:href="data:image/png;base64,iVBORw0KGgo=""#));
    }

    #[test]
    fn existing_data_url_is_kept() {
        let spec = AnimationSpec::from_image_data(
            AnimationKind::Rotate,
            2.0,
            "data:image/webp;base64,UklGRg==",
        );
        assert_eq!(spec.base_image(), "data:image/webp;base64,UklGRg==");
    }

    #[test]
    fn speed_is_clamped() {
        assert_eq!(spec(AnimationKind::Pulse, 0.1).speed_seconds(), 0.5);
        assert_eq!(spec(AnimationKind::Pulse, 9.0).speed_seconds(), 5.0);
        assert_eq!(spec(AnimationKind::Pulse, f32::NAN).speed_seconds(), 2.0);
        assert_eq!(spec(AnimationKind::Pulse, 0.5).duration(), "0.5s");

        let json = r#"{"kind":"rotate","speedSeconds":12,"baseImage":"data:x"}"#;
        let parsed: AnimationSpec = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.speed_seconds(), 5.0);
        assert_eq!(parsed.kind, AnimationKind::Rotate);
    }

    #[test]
    fn generation_is_deterministic() {
        let s = spec(AnimationKind::Rotate, 3.5);
        assert_eq!(generate(&s, 48).unwrap(), generate(&s, 48).unwrap());
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(generate(&spec(AnimationKind::Pulse, 2.0), 0).is_err());
    }

    #[test]
    fn attribute_values_are_escaped() {
        let s = AnimationSpec::from_image_data(AnimationKind::Pulse, 2.0, "data:\"><script>");
        let svg = generate(&s, 16).unwrap();
        assert!(!svg.as_str().contains("<script>"));
        assert!(svg.as_str().contains("data:&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn kind_names() {
        assert_eq!("rotate".parse::<AnimationKind>().unwrap(), AnimationKind::Rotate);
        assert!("spin".parse::<AnimationKind>().is_err());
        assert_eq!(serde_json::to_string(&AnimationKind::Pulse).unwrap(), "\"pulse\"");
    }
}
