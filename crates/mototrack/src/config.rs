//! Configuration management for mototrack.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "mototrack";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "mototrack.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "MOTOTRACK_";

/// Fleet backend used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://apirest-java-tomobile.onrender.com";

/// Identity toolkit endpoint used when nothing else is configured.
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `MOTOTRACK_`, sections split on `__`)
/// 2. TOML config file at `~/.config/mototrack/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fleet REST API configuration.
    pub api: ApiConfig,
    /// Query cache configuration.
    pub cache: CacheConfig,
    /// Local storage configuration.
    pub storage: StorageConfig,
    /// Identity provider configuration.
    pub auth: AuthConfig,
}

/// Fleet REST API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Query cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long fetched data counts as fresh, in seconds.
    pub stale_time_secs: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/mototrack/mototrack.db`
    pub database_path: Option<PathBuf>,
}

/// Identity provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Web API key of the identity project. Sign-in is unavailable without it.
    pub api_key: Option<String>,
    /// Identity toolkit endpoint.
    pub endpoint: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: 5 * 60,
        }
    }
}

impl CacheConfig {
    /// Get the staleness window as a Duration.
    #[must_use]
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
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
        check_url("api.base_url", &self.api.base_url)?;
        check_url("auth.endpoint", &self.auth.endpoint)?;

        if self.api.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "api.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self
            .auth
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            return Err(Error::ConfigValidation {
                message: "auth.api_key must not be blank when set".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(Error::ConfigValidation {
            message: format!("{field} must use http or https, got {}", url.scheme()),
        }),
        Err(err) => Err(Error::ConfigValidation {
            message: format!("{field} is not a valid URL ({value}): {err}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.cache.stale_time_secs, 300);
        assert!(config.storage.database_path.is_none());
        assert!(config.auth.api_key.is_none());
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.stale_time(), Duration::from_secs(300));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("api.base_url"));
    }

    #[test]
    fn test_validate_non_http_scheme() {
        let mut config = Config::default();
        config.auth.endpoint = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("http or https"));
    }

    #[test]
    fn test_validate_blank_api_key() {
        let mut config = Config::default();
        config.auth.api_key = Some("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("mototrack.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("mototrack"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("mototrack-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://localhost:8080\"\ntimeout_secs = 3\n\n[cache]\nstale_time_secs = 60\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 3);
        assert_eq!(config.cache.stale_time_secs, 60);
        assert_eq!(config.auth, AuthConfig::default());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_api_config_deserialize_partial() {
        let json = r#"{"timeout_secs": 30}"#;
        let api: ApiConfig = serde_json::from_str(json).unwrap();
        assert_eq!(api.timeout_secs, 30);
        assert_eq!(api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_config_serialize_sections() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("\"api\""));
        assert!(json.contains("stale_time_secs"));
    }
}
