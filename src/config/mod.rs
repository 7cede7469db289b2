use crate::utils::{get_importer_path, CONFIG_FILE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Which classifier backs the mapping stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Deterministic rules only, no network
    Local,
    /// OpenAI-compatible chat completion endpoint
    Remote,
}

fn default_mode() -> ClassifierMode {
    ClassifierMode::Local
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "IMPORTER_LLM_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    #[serde(default = "default_mode")]
    pub mode: ClassifierMode,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Number of leading rows sent to the classifier
fn default_sample_size() -> usize {
    20
}

/// Zero-padding width of generated codes ("001")
fn default_code_width() -> usize {
    3
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Importer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterConfig {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_code_width")]
    pub code_width: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            code_width: default_code_width(),
            max_upload_bytes: default_max_upload_bytes(),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Read the configuration file
pub async fn read_config(workspace_path: &Path) -> Result<Option<ImporterConfig>, ConfigError> {
    let config_path = get_importer_path(workspace_path).join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&config_path).await?;
    let config: ImporterConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Read the configuration file, falling back to defaults when absent
pub async fn load_config(workspace_path: &Path) -> Result<ImporterConfig, ConfigError> {
    Ok(read_config(workspace_path).await?.unwrap_or_default())
}

/// Write the configuration file
pub async fn write_config(workspace_path: &Path, config: &ImporterConfig) -> Result<(), ConfigError> {
    let importer_path = get_importer_path(workspace_path);
    fs::create_dir_all(&importer_path).await?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(importer_path.join(CONFIG_FILE), content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ImporterConfig =
            serde_json::from_str(r#"{"sampleSize": 5, "classifier": {"mode": "remote"}}"#).unwrap();
        assert_eq!(config.sample_size, 5);
        assert_eq!(config.code_width, 3);
        assert_eq!(config.classifier.mode, ClassifierMode::Remote);
        assert_eq!(config.classifier.api_key_env, "IMPORTER_LLM_API_KEY");
    }
}
