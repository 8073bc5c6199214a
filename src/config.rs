//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::clock::DEFAULT_HISTORY_LIMIT;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub sync: SyncConfig,

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

    /// Directory of static assets served at `/`
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

/// Clock synchronization configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Fixed "HH:MM" reference; the system clock is used when absent
    #[serde(default)]
    pub reference_time: Option<String>,

    #[serde(default)]
    pub tolerance_minutes: u32,

    /// Offset applied to UTC when reading the system clock
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,

    /// Move the reference to the current time on every tick
    #[serde(default = "default_follow_system_clock")]
    pub follow_system_clock: bool,

    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Clocks further off than this are logged as out of sync
    #[serde(default = "default_alert_tolerance")]
    pub alert_tolerance: u32,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// JSON file the registry state is loaded from and saved to
    #[serde(default)]
    pub state_file: Option<String>,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_utc_offset() -> i32 {
    330 // +05:30
}

fn default_follow_system_clock() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    60
}

fn default_alert_tolerance() -> u32 {
    5
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_admin_password() -> String {
    "tempora123".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reference_time: None,
            tolerance_minutes: 0,
            utc_offset_minutes: default_utc_offset(),
            follow_system_clock: default_follow_system_clock(),
            tick_interval_secs: default_tick_interval(),
            alert_tolerance: default_alert_tolerance(),
            history_limit: default_history_limit(),
            state_file: None,
            admin_password: default_admin_password(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

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

impl LoggingConfig {
    /// Whether the JSON formatter was requested
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
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
            dirs::config_dir().map(|p| p.join("tempora").join("config.toml")),
            Some(PathBuf::from("/etc/tempora/config.toml")),
            Some(PathBuf::from("./tempora.toml")),
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

    /// Socket address string for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("TEMPORA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("TEMPORA_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Sync overrides
        if let Some(tolerance) = var("TEMPORA_TOLERANCE") {
            if let Ok(t) = tolerance.parse() {
                self.sync.tolerance_minutes = t;
            }
        }
        if let Some(state_file) = var("TEMPORA_STATE_FILE") {
            self.sync.state_file = Some(state_file);
        }
        if let Some(password) = var("TEMPORA_ADMIN_PASS") {
            self.sync.admin_password = password;
        }

        // Logging overrides
        if let Some(level) = var("TEMPORA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TEMPORA_LOG_FORMAT") {
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
    r#"# Tempora Configuration
#
# Environment variables override these settings:
# - TEMPORA_HOST
# - TEMPORA_PORT
# - TEMPORA_TOLERANCE
# - TEMPORA_STATE_FILE
# - TEMPORA_ADMIN_PASS
# - TEMPORA_LOG_LEVEL
# - TEMPORA_LOG_FORMAT

[server]
# API server host
host = "0.0.0.0"

# API server port
port = 3000

# Directory of static files served at / (optional)
# static_dir = "./public"

[sync]
# Fixed reference time; when unset the server follows the system clock
# reference_time = "15:00"

# Clocks within this many minutes of the reference count as synchronized
tolerance_minutes = 0

# UTC offset used when reading the system clock (minutes, 330 = +05:30)
utc_offset_minutes = 330

# Move the reference time to the current time on every tick
follow_system_clock = true

# Seconds between reference ticks
tick_interval_secs = 60

# Clocks further off than this (minutes) are logged as out of sync
alert_tolerance = 5

# Entries kept in each sync, analysis and activity history
history_limit = 100

# Registry state file, loaded at startup and saved after every change
# state_file = "./tempora-state.json"

# Password required by the state import and drift endpoints
admin_password = "tempora123"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
