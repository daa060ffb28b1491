//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by the binary after resolution)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Application directory name under the platform config/data directories
pub const APP_DIR_NAME: &str = "emotion-analyzer";

/// Default SQLite file name
pub const DATABASE_FILE_NAME: &str = "emotiondata.db";

/// Upstream inference service base URL
pub const ENV_BASE_URL: &str = "EMOTION_SERVICE_BASE_URL";
/// Maximum poll attempts
pub const ENV_MAX_RETRIES: &str = "EMOTION_SERVICE_MAX_RETRIES";
/// Base backoff delay in milliseconds
pub const ENV_RETRY_DELAY_MS: &str = "EMOTION_SERVICE_RETRY_DELAY_MS";
/// SQLite database path
pub const ENV_DB_PATH: &str = "EMOTION_DB_PATH";
/// Listen port; when set the server binds on all interfaces
pub const ENV_PORT: &str = "PORT";

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite database file (None = platform default)
    pub database_path: Option<PathBuf>,
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5080,
        }
    }
}

/// Upstream inference service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Service root, e.g. `https://example.hf.space`
    pub base_url: String,
    /// Submission path relative to `base_url`; results are polled at `<call_path>/<token>`
    pub call_path: String,
    /// Poll attempts before giving up
    pub max_retries: u32,
    /// Base backoff delay, doubled after each failed attempt
    pub retry_delay_ms: u64,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// Lifetime of correlation cache entries
    pub correlation_ttl_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mustafaep-emotion-analyzer.hf.space".to_string(),
            call_path: "gradio_api/call/analyze".to_string(),
            max_retries: 3,
            retry_delay_ms: 700,
            request_timeout_secs: 30,
            correlation_ttl_secs: 300,
        }
    }
}

impl InferenceConfig {
    /// Full submission URL (`<base_url>/<call_path>`)
    pub fn submit_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.call_path.trim_matches('/')
        )
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from an optional explicit TOML path, the
    /// platform config file, and environment overrides.
    ///
    /// An explicit path must exist; the platform file is optional.
    pub fn resolve(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => load_toml_config(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => load_toml_config(&path)?,
                None => {
                    debug!("No config file found, using compiled defaults");
                    ServiceConfig::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of file/default values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(url) = env_value(ENV_BASE_URL) {
            self.inference.base_url = url;
        }

        if let Some(raw) = env_value(ENV_MAX_RETRIES) {
            self.inference.max_retries = raw.parse().map_err(|e| {
                Error::Config(format!("{} must be an integer: {}", ENV_MAX_RETRIES, e))
            })?;
        }

        if let Some(raw) = env_value(ENV_RETRY_DELAY_MS) {
            self.inference.retry_delay_ms = raw.parse().map_err(|e| {
                Error::Config(format!("{} must be an integer: {}", ENV_RETRY_DELAY_MS, e))
            })?;
        }

        if let Some(path) = env_value(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = env_value(ENV_PORT) {
            self.server.port = raw
                .parse()
                .map_err(|e| Error::Config(format!("{} must be a port number: {}", ENV_PORT, e)))?;
            // PORT means an externally reachable bind
            self.server.host = "0.0.0.0".to_string();
        }

        Ok(())
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.inference.base_url.trim().is_empty() {
            return Err(Error::Config("inference.base_url must not be empty".to_string()));
        }
        if self.inference.max_retries == 0 {
            return Err(Error::Config("inference.max_retries must be at least 1".to_string()));
        }
        if self.inference.correlation_ttl_secs == 0 {
            return Err(Error::Config(
                "inference.correlation_ttl_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Load configuration from a TOML file
pub fn load_toml_config(path: &Path) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: ServiceConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Platform config file location (`<config_dir>/emotion-analyzer/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Platform default database location
pub fn default_database_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(APP_DIR_NAME).join(DATABASE_FILE_NAME),
        None => {
            warn!("No local data directory available, using working directory for database");
            PathBuf::from(DATABASE_FILE_NAME)
        }
    }
}

/// Non-blank environment variable value
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upstream_contract() {
        let config = ServiceConfig::default();
        assert_eq!(config.inference.max_retries, 3);
        assert_eq!(config.inference.retry_delay_ms, 700);
        assert_eq!(config.inference.correlation_ttl_secs, 300);
        assert_eq!(config.server.port, 5080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_submit_url_normalizes_slashes() {
        let inference = InferenceConfig {
            base_url: "http://127.0.0.1:9000/".to_string(),
            call_path: "/gradio_api/call/analyze/".to_string(),
            ..InferenceConfig::default()
        };
        assert_eq!(
            inference.submit_url(),
            "http://127.0.0.1:9000/gradio_api/call/analyze"
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [inference]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.inference.max_retries, 5);
        assert_eq!(config.inference.retry_delay_ms, 700);
        assert_eq!(config.logging.level, "info");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = ServiceConfig::default();
        config.inference.max_retries = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_blank_base_url() {
        let mut config = ServiceConfig::default();
        config.inference.base_url = "   ".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let config = ServiceConfig {
            database_path: Some(PathBuf::from("/tmp/records.db")),
            ..ServiceConfig::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("/tmp/records.db"));
    }
}
