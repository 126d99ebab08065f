use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::recognition::RecognitionProfile;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Top-level configuration, read from a TOML file. Every field has a default,
/// so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ocr: OcrSettings,
    pub variation: VariationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrSettings {
    /// Directory holding `*.traineddata`; `None` uses the engine's own lookup.
    pub tessdata_dir: Option<PathBuf>,
    /// Wall-clock budget for image normalization before falling back to the raw image.
    pub normalize_timeout_ms: u64,
    /// Replaces the built-in recognition catalog when set. Order is significant.
    pub profiles: Option<Vec<RecognitionProfile>>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tessdata_dir: None,
            normalize_timeout_ms: 10_000,
            profiles: None,
        }
    }
}

impl OcrSettings {
    pub fn normalize_budget(&self) -> Duration {
        Duration::from_millis(self.normalize_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VariationSettings {
    /// Base URL of the Generative Language API.
    pub endpoint: String,
    pub model: String,
    /// Environment variable the API key is read from. Keys never live in the file.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Number of variants to produce per run (1..=10).
    pub count: u32,
}

impl Default for VariationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 30,
            count: 5,
        }
    }
}

impl VariationSettings {
    pub const MAX_COUNT: u32 = 10;

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(profiles) = &self.ocr.profiles {
            if profiles.is_empty() {
                return Err(ConfigError::Invalid(
                    "ocr.profiles must list at least one profile".into(),
                ));
            }
        }
        if self.variation.count == 0 || self.variation.count > VariationSettings::MAX_COUNT {
            return Err(ConfigError::Invalid(format!(
                "variation.count must be between 1 and {}, got {}",
                VariationSettings::MAX_COUNT,
                self.variation.count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::PageSegMode;

    #[test]
    fn empty_file_is_default() {
        let c = AppConfig::from_toml("").unwrap();
        assert_eq!(c, AppConfig::default());
        assert_eq!(c.ocr.normalize_budget(), Duration::from_secs(10));
        assert_eq!(c.variation.count, 5);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let c = AppConfig::from_toml(
            r#"
            [variation]
            count = 3

            [[ocr.profiles]]
            name = "eng-block"
            language = "eng"
            page_segmentation = "single_block"
            "#,
        )
        .unwrap();
        assert_eq!(c.variation.count, 3);
        assert_eq!(c.variation.model, "gemini-1.5-flash");
        let profiles = c.ocr.profiles.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].page_segmentation, Some(PageSegMode::SingleBlock));
    }

    #[test]
    fn rejects_out_of_range_count() {
        let err = AppConfig::from_toml("[variation]\ncount = 11").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_empty_profile_list() {
        let err = AppConfig::from_toml("[ocr]\nprofiles = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mathvar.toml");
        std::fs::write(&path, "[ocr]\nnormalize_timeout_ms = 2500\n").unwrap();
        let c = AppConfig::load(&path).unwrap();
        assert_eq!(c.ocr.normalize_timeout_ms, 2500);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = AppConfig::load(Path::new("/nonexistent/mathvar.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
