//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::dhis2::Dhis2Config;
use crate::import::{ImportOptions, IMPORT_LIMIT, IMPORT_REQUEST_LIMIT};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dhis2: Dhis2Settings,

    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// DHIS2 connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct Dhis2Settings {
    #[serde(default = "default_dhis2_url")]
    pub url: String,

    #[serde(default = "default_username")]
    pub username: Option<String>,

    #[serde(default = "default_password")]
    pub password: Option<String>,

    /// Personal access token, takes precedence over username/password
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_dhis2_timeout")]
    pub request_timeout_secs: u64,
}

fn default_dhis2_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_username() -> Option<String> {
    Some("admin".to_string())
}

fn default_password() -> Option<String> {
    Some("district".to_string())
}

fn default_dhis2_timeout() -> u64 {
    60
}

impl Default for Dhis2Settings {
    fn default() -> Self {
        Self {
            url: default_dhis2_url(),
            username: default_username(),
            password: default_password(),
            token: None,
            request_timeout_secs: default_dhis2_timeout(),
        }
    }
}

impl From<&Dhis2Settings> for Dhis2Config {
    fn from(settings: &Dhis2Settings) -> Self {
        Dhis2Config {
            base_url: settings.url.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            token: settings.token.clone(),
            request_timeout_ms: settings.request_timeout_secs * 1000,
        }
    }
}

/// Import pipeline settings
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_request_limit")]
    pub request_limit: usize,
}

fn default_chunk_size() -> usize {
    IMPORT_LIMIT
}

fn default_request_limit() -> usize {
    IMPORT_REQUEST_LIMIT
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            request_limit: default_request_limit(),
        }
    }
}

impl From<&ImportConfig> for ImportOptions {
    fn from(config: &ImportConfig) -> Self {
        ImportOptions {
            chunk_size: config.chunk_size,
            request_limit: config.request_limit,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("climate-import").join("config.toml")),
            Some(PathBuf::from("/etc/climate-import/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check values that would make the service unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| {
            Err(ConfigError::Invalid {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.dhis2.url.trim().is_empty() {
            return invalid("dhis2.url", "must not be empty");
        }
        if self.dhis2.request_timeout_secs == 0 {
            return invalid("dhis2.request_timeout_secs", "must be greater than 0");
        }
        if self.import.chunk_size == 0 {
            return invalid("import.chunk_size", "must be greater than 0");
        }
        if self.import.request_limit == 0 {
            return invalid("import.request_limit", "must be greater than 0");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return invalid("logging.format", "must be \"pretty\" or \"json\"");
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `CLIMATE_*` overrides from a variable lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // DHIS2 overrides
        if let Some(url) = var("CLIMATE_DHIS2_URL") {
            self.dhis2.url = url;
        }
        if let Some(username) = var("CLIMATE_DHIS2_USERNAME") {
            self.dhis2.username = Some(username);
        }
        if let Some(password) = var("CLIMATE_DHIS2_PASSWORD") {
            self.dhis2.password = Some(password);
        }
        if let Some(token) = var("CLIMATE_DHIS2_TOKEN") {
            self.dhis2.token = Some(token);
        }

        // API overrides
        if let Some(host) = var("CLIMATE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("CLIMATE_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = var("CLIMATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("CLIMATE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Climate Import Configuration
#
# Environment variables override these settings:
# - CLIMATE_DHIS2_URL
# - CLIMATE_DHIS2_USERNAME
# - CLIMATE_DHIS2_PASSWORD
# - CLIMATE_DHIS2_TOKEN
# - CLIMATE_API_HOST
# - CLIMATE_API_PORT
# - CLIMATE_LOG_LEVEL
# - CLIMATE_LOG_FORMAT

[dhis2]
# DHIS2 instance base URL
url = "http://localhost:8080"

# Basic auth credentials
username = "admin"
password = "district"

# Personal access token (preferred over basic auth)
# token = "d2pat_..."

# Request timeout in seconds
request_timeout_secs = 60

[import]
# Maximum data values per request
chunk_size = 500

# Maximum requests in flight
request_limit = 5

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/climate-import/climate-import.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_generated_config_matches_defaults() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.dhis2.url, defaults.dhis2.url);
        assert_eq!(config.dhis2.username, defaults.dhis2.username);
        assert_eq!(config.dhis2.token, None);
        assert_eq!(config.import.chunk_size, 500);
        assert_eq!(config.import.request_limit, 5);
        assert_eq!(config.api.port, defaults.api.port);
        assert_eq!(config.api.cors_origins, defaults.api.cors_origins);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [dhis2]
            url = "https://play.dhis2.org/40"
            token = "d2pat_abc"

            [import]
            request_limit = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.dhis2.url, "https://play.dhis2.org/40");
        assert_eq!(config.dhis2.request_timeout_secs, 60);
        assert_eq!(config.import.chunk_size, 500);
        assert_eq!(config.import.request_limit, 2);

        let dhis2 = Dhis2Config::from(&config.dhis2);
        assert_eq!(dhis2.token.as_deref(), Some("d2pat_abc"));
        assert_eq!(dhis2.request_timeout_ms, 60_000);

        let options = ImportOptions::from(&config.import);
        assert_eq!(options.request_limit, 2);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CLIMATE_DHIS2_URL", "https://dhis2.example.org"),
            ("CLIMATE_DHIS2_TOKEN", "d2pat_env"),
            ("CLIMATE_API_PORT", "9000"),
            ("CLIMATE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.dhis2.url, "https://dhis2.example.org");
        assert_eq!(config.dhis2.token.as_deref(), Some("d2pat_env"));
        assert_eq!(config.dhis2.username.as_deref(), Some("admin"));
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_port_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "CLIMATE_API_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.api.port, 8090);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.import.chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "import.chunk_size"
        ));

        let mut config = Config::default();
        config.import.request_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nport = 8123\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.port, 8123);

        std::fs::write(&path, "[api\nport = ").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
