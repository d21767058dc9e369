//! Configuration management for birdscribe.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bucket::DEFAULT_CACHE_CONTROL_SECS;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "birdscribe";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "birdscribe.db";

/// Default directory holding local buckets.
const BUCKETS_DIR_NAME: &str = "buckets";

/// Default bucket name.
pub const DEFAULT_BUCKET: &str = "birdscribe_ai";

/// Prefix of environment variables that override the file.
pub const ENV_PREFIX: &str = "BIRDSCRIBE_";

/// Bucket names: lowercase letters, digits, `_`, `-` and `.`, 3 to 63 long.
const BUCKET_NAME_PATTERN: &str = r"^[a-z0-9][a-z0-9_.-]{1,61}[a-z0-9]$";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BIRDSCRIBE_`, `__` separates sections)
/// 2. TOML config file at `~/.config/birdscribe/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend selection.
    pub backend: BackendConfig,
    /// Local backend settings.
    pub local: LocalConfig,
    /// Hosted backend settings.
    pub hosted: HostedConfig,
    /// Bucket write settings.
    pub storage: StorageConfig,
    /// Annotation settings.
    pub annotations: AnnotationConfig,
}

/// Which backend serves the bucket and the tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Directory bucket and SQLite tables.
    #[default]
    Local,
    /// Storage and table APIs over HTTP.
    Hosted,
}

/// Backend selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend kind.
    pub kind: BackendKind,
}

/// Local backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/birdscribe/birdscribe.db`
    pub database_path: Option<PathBuf>,
    /// Directory holding bucket directories.
    /// Defaults to `~/.local/share/birdscribe/buckets`
    pub bucket_dir: Option<PathBuf>,
    /// Base URL the bucket directory is served under. `file://` URLs are
    /// produced when unset.
    pub public_base_url: Option<String>,
}

/// Hosted backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    /// Project URL.
    pub url: Option<String>,
    /// Project API key.
    pub api_key: Option<String>,
}

/// Bucket write configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket that receives uploads.
    pub bucket: String,
    /// `Cache-Control` max-age for uploaded objects.
    pub cache_control_secs: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            cache_control_secs: DEFAULT_CACHE_CONTROL_SECS,
        }
    }
}

/// How annotations are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStrategy {
    /// A random row from each annotation table, seeded on first use.
    #[default]
    Random,
    /// One fixed description and analysis.
    Constant,
}

impl std::fmt::Display for AnnotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Constant => write!(f, "constant"),
        }
    }
}

/// Annotation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Strategy used for the whole session.
    pub strategy: AnnotationStrategy,
}

impl Config {
    /// Load configuration from all sources, reading `config_path` or the
    /// default config file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let pattern = Regex::new(BUCKET_NAME_PATTERN)
            .map_err(|e| Error::internal(format!("bucket name pattern: {e}")))?;
        if !pattern.is_match(&self.storage.bucket) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "invalid bucket name '{}': expected 3-63 lowercase letters, digits, '_', '-' or '.'",
                    self.storage.bucket
                ),
            });
        }

        if self.storage.cache_control_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "cache_control_secs must be greater than 0".to_string(),
            });
        }

        if self.backend.kind == BackendKind::Hosted {
            if self.hosted.url.as_deref().map_or(true, str::is_empty) {
                return Err(Error::ConfigValidation {
                    message: "hosted.url is required when backend.kind = \"hosted\"".to_string(),
                });
            }
            if self.hosted.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(Error::ConfigValidation {
                    message: "hosted.api_key is required when backend.kind = \"hosted\""
                        .to_string(),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.local
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the local bucket root, resolving defaults if not set.
    #[must_use]
    pub fn bucket_dir(&self) -> PathBuf {
        self.local
            .bucket_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(BUCKETS_DIR_NAME))
    }

    /// A copy safe to print: the API key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.hosted.api_key.is_some() {
            config.hosted.api_key = Some("********".to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosted_config() -> Config {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Hosted;
        config.hosted.url = Some("https://project.example.co".to_string());
        config.hosted.api_key = Some("anon-key".to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.backend.kind, BackendKind::Local);
        assert_eq!(config.storage.bucket, "birdscribe_ai");
        assert_eq!(config.storage.cache_control_secs, 3600);
        assert_eq!(config.annotations.strategy, AnnotationStrategy::Random);
        assert!(config.local.public_base_url.is_none());
        assert!(config.hosted.url.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
        assert!(hosted_config().validate().is_ok());
    }

    #[test]
    fn test_validate_bucket_name() {
        let mut config = Config::default();
        for bad in ["", "ab", "Birds", "../up", "bucket/name", "-leading"] {
            config.storage.bucket = bad.to_string();
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("invalid bucket name"), "{bad}: {err}");
        }

        config.storage.bucket = "bird-photos.v2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_cache_control() {
        let mut config = Config::default();
        config.storage.cache_control_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cache_control_secs"));
    }

    #[test]
    fn test_validate_hosted_requires_url() {
        let mut config = hosted_config();
        config.hosted.url = None;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("hosted.url"));
    }

    #[test]
    fn test_validate_hosted_requires_key() {
        let mut config = hosted_config();
        config.hosted.api_key = Some(String::new());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("hosted.api_key"));
    }

    #[test]
    fn test_local_ignores_hosted_section() {
        let mut config = Config::default();
        config.hosted.url = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("birdscribe.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.local.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_bucket_dir_default() {
        let path = Config::default().bucket_dir();
        assert!(path.ends_with("birdscribe/buckets"));
    }

    #[test]
    fn test_redacted_masks_key() {
        let redacted = hosted_config().redacted();
        assert_eq!(redacted.hosted.api_key.as_deref(), Some("********"));
        assert_eq!(redacted.hosted.url, hosted_config().hosted.url);
        assert!(Config::default().redacted().hosted.api_key.is_none());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("birdscribe"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_load_toml_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[backend]
kind = "hosted"

[hosted]
url = "https://project.example.co"
api_key = "anon-key"

[storage]
bucket = "bird_uploads"
cache_control_secs = 60

[annotations]
strategy = "constant"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Hosted);
        assert_eq!(config.storage.bucket, "bird_uploads");
        assert_eq!(config.storage.cache_control_secs, 60);
        assert_eq!(config.annotations.strategy, AnnotationStrategy::Constant);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[backend]\nkind = \"hosted\"\n").unwrap();

        let err = Config::load_from(Some(path)).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(AnnotationStrategy::Random.to_string(), "random");
        assert_eq!(AnnotationStrategy::Constant.to_string(), "constant");
    }

    #[test]
    fn test_config_serialize() {
        let toml_like = serde_json::to_string(&Config::default()).unwrap();
        assert!(toml_like.contains("cache_control_secs"));
        assert!(toml_like.contains("\"local\""));
    }
}
