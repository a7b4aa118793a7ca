//! Configuration management for the Shelfview server.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/shelfview/config.toml`.
//!
//! The configuration is built once at startup and passed explicitly to the
//! components that need it. Nothing in the listing or streaming code reads
//! the process environment.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default address the HTTP server binds to.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default collation locale for name ordering.
pub const DEFAULT_LOCALE: &str = "ja";

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("page_size must be between 1 and max_page_size ({max}), got {size}")]
    InvalidPageSize { size: usize, max: usize },

    #[error("max_page_size must be between 1 and 10000, got {0}")]
    InvalidMaxPageSize(usize),

    #[error("bind_addr is not a valid socket address: {0}")]
    InvalidBindAddr(String),

    #[error("root folder does not exist or is not a directory: {0}")]
    InvalidRoot(PathBuf),

    #[error("locale is not a valid BCP-47 tag: {0}")]
    InvalidLocale(String),

    #[error("thumbnail_size must be between 16 and 4096 pixels, got {0}")]
    InvalidThumbnailSize(u32),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the Shelfview server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Browsed library configuration.
    pub library: LibraryConfig,

    /// Media serving configuration.
    pub media: MediaConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Library configuration: what is browsed and how it is ordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root folder. No request may resolve outside of it.
    pub root: PathBuf,

    /// BCP-47 locale used to collate names.
    pub locale: String,

    /// Items per page when the client does not ask for a limit.
    pub page_size: usize,

    /// Upper bound on a client-requested limit.
    pub max_page_size: usize,
}

/// Media serving configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    /// `max-age` for image, audio and video responses, in seconds.
    pub cache_max_age: u64,

    /// Longest edge of generated thumbnails, in pixels.
    pub thumbnail_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            locale: DEFAULT_LOCALE.to_string(),
            page_size: protocol::DEFAULT_PAGE_SIZE,
            max_page_size: 1000,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cache_max_age: 3600,
            thumbnail_size: crate::files::thumbnail::DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelfview")
        .join("config.toml")
}

/// Returns the default root folder: the current working directory.
fn default_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - SHELFVIEW_ROOT_FOLDER: Override the library root (ROOT_FOLDER is also honored)
    /// - SHELFVIEW_BIND: Override the listen address
    /// - SHELFVIEW_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    ///
    /// Returns the overrides that were applied. This runs before logging is
    /// set up, so the caller logs them.
    pub fn apply_env_overrides(&mut self) -> Vec<EnvOverride> {
        let mut applied = Vec::new();

        let root = env_override("SHELFVIEW_ROOT_FOLDER").or_else(|| env_override("ROOT_FOLDER"));
        if let Some(root) = root {
            self.library.root = PathBuf::from(&root.value);
            applied.push(root);
        }

        if let Some(bind) = env_override("SHELFVIEW_BIND") {
            self.server.bind_addr = bind.value.clone();
            applied.push(bind);
        }

        if let Some(level) = env_override("SHELFVIEW_LOG_LEVEL") {
            self.server.log_level = level.value.clone();
            applied.push(level);
        }

        applied
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library.max_page_size < 1 || self.library.max_page_size > 10_000 {
            return Err(ConfigError::InvalidMaxPageSize(self.library.max_page_size));
        }

        if self.library.page_size < 1 || self.library.page_size > self.library.max_page_size {
            return Err(ConfigError::InvalidPageSize {
                size: self.library.page_size,
                max: self.library.max_page_size,
            });
        }

        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.server.bind_addr.clone()));
        }

        if !self.library.root.is_dir() {
            return Err(ConfigError::InvalidRoot(self.library.root.clone()));
        }

        if self.library.locale.parse::<icu_locid::Locale>().is_err() {
            return Err(ConfigError::InvalidLocale(self.library.locale.clone()));
        }

        if !(16..=4096).contains(&self.media.thumbnail_size) {
            return Err(ConfigError::InvalidThumbnailSize(self.media.thumbnail_size));
        }

        let level = self.server.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// An environment variable that replaced a configured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverride {
    pub var: &'static str,
    pub value: String,
}

fn env_override(var: &'static str) -> Option<EnvOverride> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|value| EnvOverride { var, value })
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
