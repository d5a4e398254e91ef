//! Configuration file parser for ~/.config/newsdesk/config.toml.
//!
//! The file is optional; a missing or empty file yields `Config::default()`.
//! Unknown keys are accepted but logged so typos are visible with `RUST_LOG`.
use crate::api::Timeouts;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Bounds applied to every timeout key, in seconds.
const TIMEOUT_RANGE: (u64, u64) = (1, 300);

/// Bounds applied to `per_page`.
const PER_PAGE_RANGE: (u32, u32) = (1, 100);

/// Top-level application configuration.
///
/// Every field has a default, so any subset of keys may be written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the aggregation backend.
    pub server_url: String,

    /// Wait bound for login, listings, deletes and reports.
    pub request_timeout_secs: u64,

    /// Wait bound for page simplification.
    pub simplify_timeout_secs: u64,

    /// Wait bound for the classify-and-summarize call.
    pub process_timeout_secs: u64,

    /// Rows requested per page on list screens.
    pub per_page: u32,

    /// Address the reader opens with.
    pub home_page: String,

    /// "dark" or "light".
    pub theme: String,

    /// Account pre-filled on the login screen.
    pub account: Option<String>,

    /// Keybinding overrides: action name to key string.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000/".to_string(),
            request_timeout_secs: 5,
            simplify_timeout_secs: 30,
            process_timeout_secs: 30,
            per_page: 10,
            home_page: "https://www.google.com".to_string(),
            theme: "dark".to_string(),
            account: None,
            keybindings: HashMap::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "server_url",
        "request_timeout_secs",
        "simplify_timeout_secs",
        "process_timeout_secs",
        "per_page",
        "home_page",
        "theme",
        "account",
        "keybindings",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or blank file → `Ok(Config::default())`
    /// - Invalid TOML or wrong value types → `Err(ConfigError::Parse)`
    /// - Larger than 1 MB → `Err(ConfigError::TooLarge)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(server = %config.server_url, theme = %config.theme, "Loaded configuration");
        Ok(config)
    }

    /// Wait bounds for the API client, clamped to 1..=300 seconds.
    pub fn timeouts(&self) -> Timeouts {
        let clamp = |secs: u64| Duration::from_secs(secs.clamp(TIMEOUT_RANGE.0, TIMEOUT_RANGE.1));
        Timeouts {
            request: clamp(self.request_timeout_secs),
            simplify: clamp(self.simplify_timeout_secs),
            process: clamp(self.process_timeout_secs),
        }
    }

    /// Rows per page, clamped to 1..=100.
    pub fn per_page(&self) -> u32 {
        self.per_page.clamp(PER_PAGE_RANGE.0, PER_PAGE_RANGE.1)
    }
}

// ============================================================================
// Tests
// ============================================================================
