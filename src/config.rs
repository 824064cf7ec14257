//! Configuration file parser for ~/.config/feedhunt/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! It supplies default search options; command-line flags override it per run.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::search::SearchOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Default search options, loadable from disk.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to the built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deep-search crawl depth in hops from the root.
    pub depth: u32,

    /// Maximum pages the crawler visits per run.
    pub max_links: usize,

    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,

    /// Errors tolerated by the crawler before stopping.
    pub max_errors: usize,

    /// Stop after this many feeds. 0 = unlimited.
    pub max_feeds: usize,

    /// Crawler worker count.
    pub concurrency: usize,

    /// Append the site URL's query string to blind-search candidates.
    pub keep_query_params: bool,

    /// Probe links on foreign domains for feeds.
    pub check_foreign_feeds: bool,
}

impl Default for Config {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            depth: options.depth,
            max_links: options.max_links,
            timeout_seconds: options.timeout.as_secs(),
            max_errors: options.max_errors,
            max_feeds: options.max_feeds,
            concurrency: options.concurrency,
            keep_query_params: options.keep_query_params,
            check_foreign_feeds: options.check_foreign_feeds,
        }
    }
}

impl Config {
    /// Maximum config file size (64 KB), far beyond any sane options file.
    const MAX_FILE_SIZE: u64 = 65_536;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
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

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to warn about likely typos
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "depth",
                "max_links",
                "timeout_seconds",
                "max_errors",
                "max_feeds",
                "concurrency",
                "keep_query_params",
                "check_foreign_feeds",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Turns the file values into search options, leaving the flags the CLI
    /// owns (`stop_at_first`, `show_errors`) at their defaults.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            depth: self.depth,
            max_links: self.max_links,
            timeout: Duration::from_secs(self.timeout_seconds),
            keep_query_params: self.keep_query_params,
            check_foreign_feeds: self.check_foreign_feeds,
            max_errors: self.max_errors,
            max_feeds: self.max_feeds,
            concurrency: self.concurrency,
            ..SearchOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_search_defaults() {
        let config = Config::default();
        let options = config.search_options();
        let defaults = SearchOptions::default();
        assert_eq!(options.depth, defaults.depth);
        assert_eq!(options.max_links, defaults.max_links);
        assert_eq!(options.timeout, defaults.timeout);
        assert_eq!(options.concurrency, defaults.concurrency);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str("depth = 5\nmax_feeds = 2").unwrap();
        assert_eq!(config.depth, 5);
        assert_eq!(config.max_feeds, 2);
        assert_eq!(config.max_links, 1000);
        assert_eq!(config.timeout_seconds, 5);
    }

    #[test]
    fn missing_file_is_defaults() {
        let config = Config::load(Path::new("/nonexistent/feedhunt/config.toml")).unwrap();
        assert_eq!(config.depth, Config::default().depth);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let result: Result<Config, _> = toml::from_str("depth = ").map_err(ConfigError::from);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
