//! Configuration management for the investment dashboard.
//!
//! The dashboard reads a single configuration file at `~/.investdash/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (INVEST_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `INVEST_API_URL` → api.base_url
//! - `INVEST_API_TIMEOUT` → api.timeout_ms
//! - `INVEST_SESSION_PATH` → session.path
//! - `INVEST_LOG_LEVEL` → observability.log_level

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".investdash"),
        |dirs| dirs.home_dir().join(".investdash"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Screener timing settings
    #[serde(default)]
    pub screener: ScreenerSettings,

    /// Session persistence settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("INVEST_API_URL") {
            self.api.base_url = url;
        }

        if let Some(timeout) = lookup("INVEST_API_TIMEOUT") {
            match timeout.parse() {
                Ok(ms) => self.api.timeout_ms = ms,
                Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid INVEST_API_TIMEOUT"),
            }
        }

        if let Some(path) = lookup("INVEST_SESSION_PATH") {
            self.session.path = Some(PathBuf::from(path));
        }

        if let Some(level) = lookup("INVEST_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }
}

// ============================================================================
// API Configuration
// ============================================================================

/// Remote API endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, including the version prefix (e.g. `/api/v1`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

// ============================================================================
// Screener Settings
// ============================================================================

/// Debounce windows used by the screener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerSettings {
    /// Quiet period after the last filter change before a query fires
    #[serde(default = "default_query_debounce_ms")]
    pub query_debounce_ms: u64,

    /// Quiet period after the last state change before the URL is rewritten
    #[serde(default = "default_url_debounce_ms")]
    pub url_debounce_ms: u64,
}

impl ScreenerSettings {
    pub fn query_debounce(&self) -> Duration {
        Duration::from_millis(self.query_debounce_ms)
    }

    pub fn url_debounce(&self) -> Duration {
        Duration::from_millis(self.url_debounce_ms)
    }
}

impl Default for ScreenerSettings {
    fn default() -> Self {
        Self {
            query_debounce_ms: default_query_debounce_ms(),
            url_debounce_ms: default_url_debounce_ms(),
        }
    }
}

fn default_query_debounce_ms() -> u64 {
    400
}

fn default_url_debounce_ms() -> u64 {
    300
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Where and whether the authenticated session is remembered between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Persist the session to disk
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Session file override (defaults to `~/.investdash/session.json`)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl SessionConfig {
    /// Resolved session file path, or `None` when persistence is disabled.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if !self.persist {
            return None;
        }
        Some(
            self.path
                .clone()
                .unwrap_or_else(|| config_dir().join("session.json")),
        )
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: true,
            path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to force to `warn`.
    ///
    /// Built-in noisy modules (hyper, reqwest, h2, rustls) are always
    /// filtered; this list adds custom ones.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
