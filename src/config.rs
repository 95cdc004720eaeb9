//! Generator configuration loaded from JSON.
//!
//! ```json
//! {
//!   "previewSize": 64,
//!   "exportSize": 512,
//!   "downloadDelayMs": 200,
//!   "backgroundTolerance": 0.12,
//!   "outputDir": "favicons",
//!   "databasePath": "favicraft.db"
//! }
//! ```
//!
//! Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compositor::{EXPORT_SIZE, PREVIEW_SIZE};
use crate::delivery::DEFAULT_DELAY;
use crate::error::{FaviconError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct GeneratorConfig {
    /// Side length of the live preview.
    pub preview_size: u32,

    /// Side length of the master every export is scaled from.
    pub export_size: u32,

    /// Gap between staggered deliveries.
    pub download_delay_ms: u64,

    /// Background removal tolerance, 0.0-1.0.
    pub background_tolerance: f32,

    pub output_dir: PathBuf,

    pub database_path: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            preview_size: PREVIEW_SIZE,
            export_size: EXPORT_SIZE,
            download_delay_ms: DEFAULT_DELAY.as_millis() as u64,
            background_tolerance: 0.12,
            output_dir: PathBuf::from("favicons"),
            database_path: PathBuf::from("favicraft.db"),
        }
    }
}

impl GeneratorConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FaviconError::Config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FaviconError::Config(format!("failed to serialize configuration: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.preview_size == 0 {
            return Err(FaviconError::Config("previewSize must be positive".into()));
        }
        if self.export_size == 0 {
            return Err(FaviconError::Config("exportSize must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.background_tolerance) {
            return Err(FaviconError::Config(format!(
                "backgroundTolerance must be within 0-1, got {}",
                self.background_tolerance
            )));
        }
        Ok(())
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = GeneratorConfig::from_json("{}").unwrap();
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.preview_size, 64);
        assert_eq!(config.export_size, 512);
        assert_eq!(config.download_delay(), Duration::from_millis(200));
    }

    #[test]
    fn partial_document_overrides() {
        let config =
            GeneratorConfig::from_json(r#"{"exportSize": 256, "downloadDelayMs": 0}"#).unwrap();
        assert_eq!(config.export_size, 256);
        assert_eq!(config.download_delay(), Duration::ZERO);
        assert_eq!(config.preview_size, 64);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            GeneratorConfig::from_json(r#"{"previewSize": 0}"#),
            Err(FaviconError::Config(_))
        ));
        assert!(GeneratorConfig::from_json(r#"{"backgroundTolerance": 2.0}"#).is_err());
        assert!(GeneratorConfig::from_json("not json").is_err());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favicraft.json");
        fs::write(&path, r#"{"outputDir": "public"}"#).unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("public"));

        let json = config.to_json_pretty().unwrap();
        assert!(json.contains("\"outputDir\": \"public\""));
    }
}
