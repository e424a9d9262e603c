//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chat::Language;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional per-request timeout. Unset means requests never time out.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

/// Dataset sizes requested from the backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default = "default_states_limit")]
    pub states_limit: usize,

    #[serde(default = "default_crisis_limit")]
    pub crisis_limit: usize,
}

fn default_states_limit() -> usize {
    crate::api::DEFAULT_STATES_LIMIT
}

fn default_crisis_limit() -> usize {
    crate::api::DEFAULT_CRISIS_LIMIT
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            states_limit: default_states_limit(),
            crisis_limit: default_crisis_limit(),
        }
    }
}

/// Interaction settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    #[serde(default = "default_resize_debounce")]
    pub resize_debounce_ms: u64,

    #[serde(default = "default_toast_ttl")]
    pub toast_ttl_ms: u64,

    #[serde(default)]
    pub default_language: Language,
}

fn default_resize_debounce() -> u64 {
    250
}

fn default_toast_ttl() -> u64 {
    3000
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: default_resize_debounce(),
            toast_ttl_ms: default_toast_ttl(),
            default_language: Language::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log file for the interactive dashboard, which owns the terminal.
    /// Unset means `<data dir>/uidai-dashboard/uidai-dashboard.log`.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Where the interactive dashboard writes its logs
    pub fn file_path(&self) -> PathBuf {
        match &self.file {
            Some(path) => path.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("uidai-dashboard")
                .join("uidai-dashboard.log"),
        }
    }
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

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
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

    /// Load from default locations or environment.
    ///
    /// Runs before logging is set up, so nothing is logged here; call
    /// [`LoadedConfig::report`] once a subscriber is installed.
    pub fn load_default() -> LoadedConfig {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("uidai-dashboard").join("config.toml")),
            Some(PathBuf::from("/etc/uidai-dashboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// First of `paths` that exists and loads; defaults plus environment
    /// when none does
    pub fn load_first(paths: &[PathBuf]) -> LoadedConfig {
        let mut rejected = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path.clone()),
                        rejected,
                    }
                }
                Err(e) => rejected.push(e),
            }
        }

        LoadedConfig {
            config: Self::from_env(),
            source: None,
            rejected,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("UIDAI_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(timeout) = std::env::var("UIDAI_API_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.api.request_timeout_secs = Some(t);
            }
        }

        if let Ok(limit) = std::env::var("UIDAI_STATES_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.dashboard.states_limit = l;
            }
        }
        if let Ok(limit) = std::env::var("UIDAI_CRISIS_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.dashboard.crisis_limit = l;
            }
        }

        if let Ok(lang) = std::env::var("UIDAI_LANGUAGE") {
            if let Ok(l) = lang.parse() {
                self.ui.default_language = l;
            }
        }

        if let Ok(level) = std::env::var("UIDAI_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("UIDAI_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(file) = std::env::var("UIDAI_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
    }
}

/// Result of searching the default config locations
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config came from; `None` for defaults plus environment
    pub source: Option<PathBuf>,
    /// Files that exist but failed to load, in search order
    pub rejected: Vec<ConfigError>,
}

impl LoadedConfig {
    /// Log where the config came from and every file that was skipped
    pub fn report(&self) {
        for error in &self.rejected {
            tracing::warn!(error = %error, "Skipped config file");
        }
        match &self.source {
            Some(path) => tracing::info!("Loaded config from {:?}", path),
            None => tracing::info!("Using default config with environment overrides"),
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
    r#"# UIDAI Dashboard Configuration
#
# Environment variables override these settings:
# - UIDAI_API_URL
# - UIDAI_API_TIMEOUT_SECS
# - UIDAI_STATES_LIMIT
# - UIDAI_CRISIS_LIMIT
# - UIDAI_LANGUAGE
# - UIDAI_LOG_LEVEL
# - UIDAI_LOG_FORMAT
# - UIDAI_LOG_FILE

[api]
# Analytics backend URL
base_url = "http://localhost:8000"

# Per-request timeout in seconds (omit to wait indefinitely)
# request_timeout_secs = 30

[dashboard]
# Number of state rankings to request
states_limit = 20

# Number of crisis districts to request
crisis_limit = 30

[ui]
# Chart re-render delay after the last resize event (ms)
resize_debounce_ms = 250

# How long notices stay visible (ms)
toast_ttl_ms = 3000

# Assistant reply language: en, hi, te
default_language = "en"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Log file for the interactive dashboard (one-shot commands log to stderr)
# file = "/var/log/uidai-dashboard.log"
"#
    .to_string()
}
