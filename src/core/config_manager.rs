// src/core/config_manager.rs
//! Configuration loading. The file is read once at startup into an
//! immutable `AppConfig` that is passed by reference to every component.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::core::FsOps;

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DATABASE_ENV: &str = "JOBSCOUT_DATABASE";
const HANDOFF_DIR_ENV: &str = "JOBSCOUT_HANDOFF_DIR";
const API_KEY_ENV: &str = "AGENTMAIL_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub search: SearchConfig,
    #[serde(default)]
    pub scoring: ScoringWeights,
    pub email: EmailConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub target_companies: Vec<String>,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub industries_priority: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

/// Points awarded per matched category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_weight")]
    pub location_match: i64,
    #[serde(default = "default_weight")]
    pub title_match: i64,
    #[serde(default = "default_weight")]
    pub company_match: i64,
    #[serde(default = "default_weight")]
    pub industry_match: i64,
    #[serde(default = "default_creative_weight")]
    pub creative_industry: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            location_match: default_weight(),
            title_match: default_weight(),
            company_match: default_weight(),
            industry_match: default_weight(),
            creative_industry: default_creative_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub bcc: Option<String>,
    /// Sending inbox id
    pub from: String,
    #[serde(default = "default_top_count")]
    pub top_count: usize,
    #[serde(default = "default_digest_title")]
    pub digest_title: String,
    #[serde(default = "default_mail_api_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub api_key_file: Option<PathBuf>,
}

/// Fetch settings and the phrase lists used to classify posting pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_closed_phrases")]
    pub closed_phrases: Vec<String>,
    #[serde(default = "default_apply_phrases")]
    pub apply_phrases: Vec<String>,
}

impl ValidationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            delay_ms: default_delay_ms(),
            user_agent: default_user_agent(),
            closed_phrases: default_closed_phrases(),
            apply_phrases: default_apply_phrases(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_handoff_dir")]
    pub handoff_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            handoff_dir: default_handoff_dir(),
        }
    }
}

fn default_weight() -> i64 {
    5
}

fn default_creative_weight() -> i64 {
    3
}

fn default_top_count() -> usize {
    10
}

fn default_digest_title() -> String {
    "Job Search".to_string()
}

fn default_mail_api_url() -> String {
    "https://api.agentmail.to".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

pub fn default_closed_phrases() -> Vec<String> {
    [
        "no longer accepting",
        "position closed",
        "position filled",
        "applications closed",
        "job is closed",
        "expired",
        "this job is no longer available",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn default_apply_phrases() -> Vec<String> {
    [
        "apply now",
        "apply for",
        "submit application",
        "apply button",
        "apply online",
        "click to apply",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("jobscout.db")
}

fn default_handoff_dir() -> PathBuf {
    PathBuf::from("handoff")
}

pub struct ConfigManager;

impl ConfigManager {
    /// Load, apply environment overrides, resolve paths and validate
    pub fn load(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            anyhow::bail!(
                "{} not found. The pipeline cannot run without configuration.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config = AppConfig::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.apply_env_overrides();

        let base_dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir().context("Failed to get current directory")?,
        };
        config.resolve_paths(&base_dir);
        config.validate()?;

        info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }
}

impl AppConfig {
    /// Parse without touching the environment or the filesystem.
    /// JSON documents are valid YAML, so both formats are accepted.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Invalid configuration document")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(DATABASE_ENV) {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(HANDOFF_DIR_ENV) {
            self.storage.handoff_dir = PathBuf::from(path);
        }
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        self.storage.database_path = FsOps::normalize_path(base_dir, &self.storage.database_path);
        self.storage.handoff_dir = FsOps::normalize_path(base_dir, &self.storage.handoff_dir);
        if let Some(key_file) = &self.email.api_key_file {
            self.email.api_key_file = Some(FsOps::normalize_path(base_dir, key_file));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.email.top_count == 0 {
            anyhow::bail!("email.top_count must be at least 1");
        }
        if self.email.from.trim().is_empty() {
            anyhow::bail!("email.from must name the sending inbox");
        }
        if self.validation.timeout_secs == 0 {
            anyhow::bail!("validation.timeout_secs must be at least 1");
        }
        if self.validation.apply_phrases.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("validation.apply_phrases must contain at least one phrase");
        }
        Ok(())
    }

    /// Mail API key from the environment, else from the configured key file
    pub fn mail_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        let key_file = self.email.api_key_file.as_ref().with_context(|| {
            format!(
                "{} is not set and email.api_key_file is not configured",
                API_KEY_ENV
            )
        })?;

        let key = std::fs::read_to_string(key_file)
            .with_context(|| format!("Failed to read API key file: {}", key_file.display()))?;
        Ok(key.trim().to_string())
    }

    /// Ensure the database and handoff directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        FsOps::ensure_dir_exists(&self.storage.handoff_dir).await?;
        if let Some(db_parent) = self.storage.database_path.parent() {
            if !db_parent.as_os_str().is_empty() {
                FsOps::ensure_dir_exists(db_parent).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
search:
  target_companies: [Acme]
  job_titles: [Engineer]
email:
  recipients: [someone@example.com]
  from: scout@agentmail.to
"#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = AppConfig::from_yaml_str(MINIMAL).expect("config parses");
        assert_eq!(config.scoring.title_match, 5);
        assert_eq!(config.scoring.creative_industry, 3);
        assert_eq!(config.email.top_count, 10);
        assert_eq!(config.validation.timeout_secs, 10);
        assert_eq!(config.validation.delay(), Duration::from_secs(1));
        assert_eq!(config.validation.closed_phrases.len(), 7);
        assert_eq!(config.validation.apply_phrases.len(), 6);
        assert!(config.search.locations.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_config_is_accepted() {
        let json = r#"{
            "search": {"job_titles": ["Designer"], "locations": ["Venice"]},
            "scoring": {"location_match": 7, "title_match": 4, "company_match": 6,
                        "industry_match": 2, "creative_industry": 1},
            "email": {"recipients": ["a@example.com"], "bcc": "b@example.com",
                      "from": "inbox@agentmail.to", "top_count": 5}
        }"#;

        let config = AppConfig::from_yaml_str(json).expect("json parses as yaml");
        assert_eq!(config.scoring.location_match, 7);
        assert_eq!(config.email.bcc.as_deref(), Some("b@example.com"));
        assert_eq!(config.email.top_count, 5);
    }

    #[test]
    fn test_zero_top_count_is_rejected() {
        let mut config = AppConfig::from_yaml_str(MINIMAL).expect("config parses");
        config.email.top_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            format!(
                "{}\nstorage:\n  database_path: data/jobs.db\n  handoff_dir: /tmp/handoff-abs\n",
                MINIMAL
            ),
        )
        .expect("write config");

        let config = ConfigManager::load(&path).expect("config loads");
        if std::env::var(DATABASE_ENV).is_err() {
            assert_eq!(config.storage.database_path, dir.path().join("data/jobs.db"));
        }
        if std::env::var(HANDOFF_DIR_ENV).is_err() {
            assert_eq!(config.storage.handoff_dir, PathBuf::from("/tmp/handoff-abs"));
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigManager::load(Path::new("/nonexistent/jobscout.yaml"));
        assert!(result.is_err());
    }
}
