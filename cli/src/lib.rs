use mask::{AutoMaskConfig, CoverageReport, MaskError};
use providers::{ProviderConfig, ProviderError};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable consulted when `--api-token` is not given
pub const API_TOKEN_ENV: &str = "MASK_PROVIDER_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Pipeline(#[from] MaskError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Everything the engine needs: how to clean masks and where the providers are
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub pipeline: AutoMaskConfig,
    pub provider: ProviderConfig,
}

impl EngineConfig {
    /// Load EngineConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load EngineConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load EngineConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load EngineConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    /// Write the configuration, picking the format from the extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml_file(path),
            Some("json") => self.to_json_file(path),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    /// Save EngineConfig to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert EngineConfig to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Save EngineConfig to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert EngineConfig to JSON string
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        self.provider.validate()?;
        Ok(())
    }

    /// Fill in the provider token; an explicit flag beats the environment
    pub fn with_api_token(mut self, flag: Option<String>, env: Option<String>) -> Self {
        if let Some(token) = flag.or(env).filter(|t| !t.trim().is_empty()) {
            self.provider.api_token = Some(token);
        }
        self
    }
}

/// JSON schema of [`EngineConfig`]
pub fn schema() -> Result<String, ConfigError> {
    let schema = schemars::schema_for!(EngineConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}

/// Report path used when none is given: the mask path with a `.json` extension
pub fn default_report_path(mask_path: &Path) -> PathBuf {
    mask_path.with_extension("json")
}

/// Write a coverage report as pretty JSON
pub fn write_report<P: AsRef<Path>>(path: P, report: &CoverageReport) -> Result<(), ConfigError> {
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mask::{FallbackReason, Mask};
    use tempfile::tempdir;

    #[test]
    fn test_toml_round_trip() {
        let dir = tempdir().expect("Should create temp dir");
        let path = dir.path().join("engine.toml");

        let mut config = EngineConfig::default();
        config.pipeline.dilation_radius = 3;
        config.provider.concurrent_fetch = false;
        config.to_file(&path).expect("Should write TOML");

        let loaded = EngineConfig::from_file(&path).expect("Should load TOML");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().expect("Should create temp dir");
        let path = dir.path().join("engine.json");

        let config = EngineConfig::default();
        config.to_json_file(&path).expect("Should write JSON");
        assert_eq!(EngineConfig::from_file(&path).expect("Should load JSON"), config);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            EngineConfig::from_file("engine.yaml"),
            Err(ConfigError::UnsupportedFileFormat)
        ));
        assert!(matches!(
            EngineConfig::default().to_file("engine"),
            Err(ConfigError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [pipeline]
            min_component_size = 500

            [provider]
            timeout_secs = 15
            "#,
        )
        .expect("Should parse partial config");
        assert_eq!(config.pipeline.min_component_size, 500);
        assert_eq!(config.pipeline.dilation_radius, AutoMaskConfig::default().dilation_radius);
        assert_eq!(config.provider.timeout_secs, 15);
        assert!(config.provider.concurrent_fetch);
    }

    #[test]
    fn test_invalid_values_are_rejected_on_load() {
        let result = EngineConfig::from_toml("[pipeline]\nmax_coverage_pct = 250.0\n");
        assert!(matches!(result, Err(ConfigError::Pipeline(_))));

        let result = EngineConfig::from_json(r#"{"provider": {"segmentation_url": "nowhere"}}"#);
        assert!(matches!(result, Err(ConfigError::Provider(_))));
    }

    #[test]
    fn test_api_token_precedence() {
        let flag = EngineConfig::default()
            .with_api_token(Some("flag".to_string()), Some("env".to_string()));
        assert_eq!(flag.provider.api_token.as_deref(), Some("flag"));

        let env = EngineConfig::default().with_api_token(None, Some("env".to_string()));
        assert_eq!(env.provider.api_token.as_deref(), Some("env"));

        let blank = EngineConfig::default().with_api_token(Some("  ".to_string()), None);
        assert_eq!(blank.provider.api_token, None);
    }

    #[test]
    fn test_schema_names_both_sections() {
        let schema = schema().expect("Should render schema");
        assert!(schema.contains("pipeline"));
        assert!(schema.contains("max_coverage_pct"));
        assert!(schema.contains("segmentation_url"));
    }

    #[test]
    fn test_report_written_next_to_mask() {
        let dir = tempdir().expect("Should create temp dir");
        let mask_path = dir.path().join("out.png");
        let report_path = default_report_path(&mask_path);
        assert_eq!(report_path, dir.path().join("out.json"));

        let mask = Mask::filled_rect(10, 10, 0, 5, 0, 10);
        let report = CoverageReport::for_fallback(&mask, FallbackReason::NoMatchingSegments);
        write_report(&report_path, &report).expect("Should write report");

        let written: CoverageReport =
            serde_json::from_str(&fs::read_to_string(&report_path).expect("Should read"))
                .expect("Should parse report");
        assert_eq!(written, report);
    }
}
