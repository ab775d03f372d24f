//! Configuration management for esdump
//!
//! This module handles loading, parsing, and validating configuration from:
//! - Configuration files (TOML format)
//! - Command-line arguments (applied by the `cli` module)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search index connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Export pipeline tuning
    #[serde(default)]
    pub export: ExportSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the Elasticsearch cluster
    #[serde(default = "default_url")]
    pub url: String,

    /// Index (or alias / comma-separated list) to export from
    #[serde(default)]
    pub index: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How long the server keeps a scroll context alive between pages
    #[serde(default = "default_scroll_keepalive")]
    pub scroll_keepalive: String,

    /// Basic auth username
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Export pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Number of hits requested per scroll page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pages shorter than this end the export (defaults to `page_size`)
    #[serde(default)]
    pub exhaustion_threshold: Option<usize>,

    /// Capacity of the queue between the fetch and write stages
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Log fetch timing every this many pages
    #[serde(default = "default_report_interval")]
    pub page_report_interval: u64,

    /// Log write progress every this many records
    #[serde(default = "default_report_interval")]
    pub item_report_interval: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_url() -> String {
    "http://127.0.0.1:9200".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_scroll_keepalive() -> String {
    "5m".to_string()
}

fn default_page_size() -> usize {
    10_000
}

fn default_queue_capacity() -> usize {
    300
}

fn default_report_interval() -> u64 {
    10_000
}

fn default_log_level() -> LogLevel {
    // Progress summaries are logged at info
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            index: None,
            timeout: default_timeout(),
            scroll_keepalive: default_scroll_keepalive(),
            username: None,
            password: None,
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            exhaustion_threshold: None,
            queue_capacity: default_queue_capacity(),
            page_report_interval: default_report_interval(),
            item_report_interval: default_report_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::InvalidFormat(format!("{}: {}", path.display(), e))
            }
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicitly given path must exist. The default path is optional.
    ///
    /// # Arguments
    /// * `path` - Explicit config file, or `None` for the default location
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".esdump")
            .join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        self.connection.validate_url()?;

        if self.connection.scroll_keepalive.trim().is_empty() {
            return Err(invalid("connection.scroll_keepalive", "").into());
        }
        if self.connection.timeout == 0 {
            return Err(invalid("connection.timeout", "0").into());
        }
        if self.export.page_size == 0 {
            return Err(invalid("export.page_size", "0").into());
        }
        if self.export.queue_capacity == 0 {
            return Err(invalid("export.queue_capacity", "0").into());
        }
        if self.export.page_report_interval == 0 {
            return Err(invalid("export.page_report_interval", "0").into());
        }
        if self.export.item_report_interval == 0 {
            return Err(invalid("export.item_report_interval", "0").into());
        }
        if let Some(threshold) = self.export.exhaustion_threshold {
            // A threshold above the page size would end the run after one full page
            if threshold == 0 || threshold > self.export.page_size {
                return Err(invalid("export.exhaustion_threshold", &threshold.to_string()).into());
            }
        }
        if self.connection.password.is_some() && self.connection.username.is_none() {
            return Err(ConfigError::MissingField("connection.username".to_string()).into());
        }
        Ok(())
    }

}

impl ConnectionConfig {
    /// Per-request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Check that the URL is an http(s) endpoint
    pub fn validate_url(&self) -> Result<()> {
        let url = self.url.trim();
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        match rest {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(invalid("connection.url", url).into()),
        }
    }
}

impl ExportSettings {
    /// Page length below which the index counts as exhausted
    pub fn effective_threshold(&self) -> usize {
        self.exhaustion_threshold.unwrap_or(self.page_size)
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
