//! Configuration management for sdkci
//!
//! Repository-level settings for the build service connection, polling
//! limits, logical file names and preview branch naming. CLI flags override
//! whatever is loaded here.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{Result, SdkciError};

/// Smallest accepted sleep between polling passes
pub const MIN_INTERVAL_SECONDS: u64 = 1;

/// Repository-level sdkci configuration
///
/// Loaded from `.sdkci/config.toml` in the repo root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdkciConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub files: FileNames,

    #[serde(default)]
    pub preview: PreviewConfig,
}

/// Build service connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable containing the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Build polling limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Global deadline for a polling loop
    #[serde(default = "default_max_polling_seconds")]
    pub max_polling_seconds: u64,

    /// Sleep between polling passes
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

/// Logical file names used in revisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNames {
    #[serde(default = "default_spec_name")]
    pub spec_name: String,

    #[serde(default = "default_config_name")]
    pub config_name: String,
}

/// Preview branch naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    #[serde(default = "default_main_branch")]
    pub main_branch: String,
}

// Default value providers
fn default_base_url() -> String {
    "https://api.stainless.com".to_string()
}

fn default_api_key_env() -> String {
    "STAINLESS_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_polling_seconds() -> u64 {
    10 * 60
}

fn default_interval_seconds() -> u64 {
    5
}

fn default_spec_name() -> String {
    "openapi.yml".to_string()
}

fn default_config_name() -> String {
    "openapi.stainless.yml".to_string()
}

fn default_branch_prefix() -> String {
    "preview/".to_string()
}

fn default_main_branch() -> String {
    "main".to_string()
}

impl SdkciConfig {
    /// Load configuration from `.sdkci/config.toml` or use defaults
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(".sdkci/config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SdkciError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the poller cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_seconds < MIN_INTERVAL_SECONDS {
            return Err(SdkciError::Config(format!(
                "polling.interval_seconds must be at least {}",
                MIN_INTERVAL_SECONDS
            )));
        }
        Ok(())
    }

    /// Write default configuration to `.sdkci/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<()> {
        let config_dir = repo_root.join(".sdkci");
        std::fs::create_dir_all(&config_dir)?;

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| SdkciError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(config_dir.join("config.toml"), content)?;
        Ok(())
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollingConfig {
    pub fn max_polling(&self) -> Duration {
        Duration::from_secs(self.max_polling_seconds)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl PreviewConfig {
    /// Preview branch name for a git ref, e.g. `feature-x` -> `preview/feature-x`
    pub fn branch_for(&self, git_ref: &str) -> String {
        format!("{}{}", self.branch_prefix, git_ref)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_polling_seconds: default_max_polling_seconds(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            spec_name: default_spec_name(),
            config_name: default_config_name(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            branch_prefix: default_branch_prefix(),
            main_branch: default_main_branch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SdkciConfig::default();
        assert_eq!(config.polling.max_polling(), Duration::from_secs(600));
        assert_eq!(config.polling.interval(), Duration::from_secs(5));
        assert_eq!(config.files.spec_name, "openapi.yml");
        assert_eq!(config.files.config_name, "openapi.stainless.yml");
        assert_eq!(config.preview.branch_for("feature-x"), "preview/feature-x");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SdkciConfig::from_toml(
            r#"
[polling]
max_polling_seconds = 120

[preview]
main_branch = "trunk"
"#,
        )
        .unwrap();

        assert_eq!(config.polling.max_polling_seconds, 120);
        assert_eq!(config.polling.interval_seconds, 5);
        assert_eq!(config.preview.main_branch, "trunk");
        assert_eq!(config.preview.branch_prefix, "preview/");
        assert_eq!(config.api, ApiConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = SdkciConfig::from_toml("[polling\nmax = ").unwrap_err();
        assert!(matches!(err, SdkciError::Config(_)));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = SdkciConfig::from_toml("[polling]\ninterval_seconds = 0\n").unwrap_err();
        assert!(matches!(err, SdkciError::Config(_)));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let config = SdkciConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, SdkciConfig::default());
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        SdkciConfig::write_default(dir.path()).unwrap();
        assert!(dir.path().join(".sdkci/config.toml").exists());

        let config = SdkciConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, SdkciConfig::default());
    }
}
