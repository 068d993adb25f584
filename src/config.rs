//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Alert stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Idle interval between keep-alive comments
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Frames buffered per connection before the client counts as stalled
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_max_channels")]
    pub max_channels_per_user: usize,
}

fn default_keep_alive() -> u64 {
    15
}

fn default_channel_capacity() -> usize {
    64
}

fn default_max_channels() -> usize {
    16
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive(),
            channel_capacity: default_channel_capacity(),
            max_channels_per_user: default_max_channels(),
        }
    }
}

/// External detection service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_detector_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_detector_retries")]
    pub max_retries: u32,

    /// Minimum confidence for an anomaly to raise an alert
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

fn default_detector_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_detector_timeout() -> u64 {
    30_000
}

fn default_detector_retries() -> u32 {
    2
}

fn default_confidence_threshold() -> f64 {
    0.5
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_detector_url(),
            api_key: None,
            timeout_ms: default_detector_timeout(),
            max_retries: default_detector_retries(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
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
            dirs::config_dir().map(|p| p.join("campus-sentinel").join("config.toml")),
            Some(PathBuf::from("/etc/campus-sentinel/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source
    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = var("SENTINEL_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SENTINEL_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        // Realtime overrides
        if let Some(secs) = var("SENTINEL_KEEP_ALIVE_SECS").and_then(|s| s.parse().ok()) {
            self.realtime.keep_alive_secs = secs;
        }

        // Detector overrides
        if let Some(url) = var("SENTINEL_DETECTOR_URL") {
            self.detector.base_url = url;
        }
        if let Some(key) = var("SENTINEL_DETECTOR_API_KEY") {
            self.detector.api_key = Some(key).filter(|k| !k.is_empty());
        }

        // Logging overrides
        if let Some(level) = var("SENTINEL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("SENTINEL_LOG_FORMAT") {
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
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Campus Sentinel Configuration
#
# Environment variables override these settings:
# - SENTINEL_HOST
# - SENTINEL_PORT
# - SENTINEL_KEEP_ALIVE_SECS
# - SENTINEL_DETECTOR_URL
# - SENTINEL_DETECTOR_API_KEY
# - SENTINEL_LOG_LEVEL
# - SENTINEL_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 8090

# Allowed CORS origins (empty = allow any)
cors_origins = []

[realtime]
# Seconds of idleness before a keep-alive comment is sent on an alert stream
keep_alive_secs = 15

# Frames buffered per connection; a client that falls this far behind is dropped
channel_capacity = 64

# Open alert streams allowed per user
max_channels_per_user = 16

[detector]
# Anomaly detection service URL
base_url = "http://localhost:8000"

# Optional bearer token for the detection service
# api_key = ""

# Request timeout in milliseconds
timeout_ms = 30000

# Retries for connection failures, timeouts and 5xx responses
max_retries = 2

# Minimum confidence for an anomaly to raise an alert
confidence_threshold = 0.5

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
