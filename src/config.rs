//! Configuration file parser for `planet.toml`.
//!
//! The config file is optional; a missing file yields `Config::default()`,
//! which has no feeds. Unknown keys are accepted by serde and collected in
//! `Config::unknown_keys` so the caller can report them once logging is up. Values are validated after parsing so a bad feed URL or
//! date format fails at startup instead of halfway through a run.
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::date;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// One configured feed source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Feed {
    /// Short unique name; stored on every post as `feed_name`.
    pub name: String,
    /// URL of the RSS or Atom document.
    pub url: String,
    /// Optional homepage of the site behind the feed.
    #[serde(default)]
    pub home: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Stderr,
    File,
}

/// Where diagnostics go. Passed explicitly to the subscriber setup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub target: LogTarget,
    /// Log file, required when `target = "file"`. Lines are appended.
    pub path: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::Stderr,
            path: None,
            filter: "info".to_string(),
        }
    }
}

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,

    /// Only posts published within this many days are exported.
    pub days: u32,

    /// Upper bound on exported posts.
    pub max_posts: u32,

    /// Delete posts older than this many days after ingesting. Off when unset.
    pub retention_days: Option<u32>,

    /// Maximum number of feeds downloaded at once.
    pub concurrency: usize,

    /// strftime pattern for the human-readable date in the export.
    pub date_format: String,

    pub log: LogConfig,

    pub feeds: Vec<Feed>,

    /// Top-level keys present in the file that planet does not know.
    #[serde(skip)]
    pub unknown_keys: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("planet.db"),
            days: 14,
            max_posts: 100,
            retention_days: None,
            concurrency: 8,
            date_format: "%F at %T".to_string(),
            log: LogConfig::default(),
            feeds: Vec::new(),
            unknown_keys: Vec::new(),
        }
    }
}

impl Config {
    /// Upper bound for `days` and `retention_days` (about a century).
    pub const MAX_DAYS: u32 = 36_500;

    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "database",
        "days",
        "max_posts",
        "retention_days",
        "concurrency",
        "date_format",
        "log",
        "feeds",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Invalid values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, listed in `unknown_keys`
    ///
    /// Nothing is logged here: this runs before the subscriber from
    /// `[log]` is installed.
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
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            // File deleted between metadata and read
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut config: Config = toml::from_str(content)?;
        config.validate()?;

        // Re-read as a raw table to find keys serde silently ignored
        if let Ok(raw) = content.parse::<toml::Table>() {
            config.unknown_keys = raw
                .keys()
                .filter(|key| !Self::KNOWN_KEYS.contains(&key.as_str()))
                .cloned()
                .collect();
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::Invalid("days must be at least 1".into()));
        }
        if self.days > Self::MAX_DAYS {
            return Err(ConfigError::Invalid(format!(
                "days must be at most {}",
                Self::MAX_DAYS
            )));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.retention_days == Some(0) {
            return Err(ConfigError::Invalid(
                "retention_days must be at least 1 (omit it to keep everything)".into(),
            ));
        }
        if self.retention_days.is_some_and(|d| d > Self::MAX_DAYS) {
            return Err(ConfigError::Invalid(format!(
                "retention_days must be at most {} (omit it to keep everything)",
                Self::MAX_DAYS
            )));
        }
        date::validate_format(&self.date_format)
            .map_err(|e| ConfigError::Invalid(format!("date_format: {}", e)))?;
        if self.log.target == LogTarget::File && self.log.path.is_none() {
            return Err(ConfigError::Invalid(
                "log.path is required when log.target = \"file\"".into(),
            ));
        }

        let mut names = HashSet::new();
        for feed in &self.feeds {
            if feed.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "feed with url {} has an empty name",
                    feed.url
                )));
            }
            if !names.insert(feed.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate feed name {:?}",
                    feed.name
                )));
            }
            check_http_url(&feed.name, "url", &feed.url)?;
            if let Some(home) = &feed.home {
                check_http_url(&feed.name, "home", home)?;
            }
        }
        Ok(())
    }
}

fn check_http_url(feed: &str, key: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| {
        ConfigError::Invalid(format!("feed {:?}: invalid {} {:?}: {}", feed, key, value, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::Invalid(format!(
            "feed {:?}: {} must be http or https, got {}",
            feed, key, scheme
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
