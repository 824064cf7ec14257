//! Multi-strategy feed search.
//!
//! Four independent strategies discover feeds for a site, coordinated by
//! [`SearchSession`] under a shared budget policy:
//!
//! - [`meta_links`]: `<link>` declarations in the page head (cheap, no probing)
//! - [`anchors`]: every same-domain anchor on the page, probed
//! - [`blind`]: a catalog of historically common feed endpoints, probed per
//!   path level up to the origin
//! - [`crawler`]: a depth- and concurrency-bounded crawl of the whole site
//!
//! Strategies report progress through the [`events`] stream and respect the
//! same [`SearchOptions`] budgets (max feeds, max errors, max links, depth).

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::classify::FeedKind;

pub mod anchors;
pub mod blind;
pub mod crawler;
pub mod events;
pub mod meta_links;
mod session;

pub use session::{SearchMode, SearchReport, SearchSession};

/// A feed discovery strategy, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    MetaLinks,
    Anchors,
    Blind,
    Deep,
}

impl Strategy {
    /// Human-readable name for progress display.
    pub fn nice_name(self) -> &'static str {
        match self {
            Strategy::MetaLinks => "Meta links",
            Strategy::Anchors => "Check all anchors",
            Strategy::Blind => "Blind search",
            Strategy::Deep => "Deep search",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::MetaLinks => "metalinks",
            Strategy::Anchors => "anchors",
            Strategy::Blind => "blindsearch",
            Strategy::Deep => "deepsearch",
        };
        write!(f, "{name}")
    }
}

/// A feed discovered during a search.
///
/// Identity is the `url`, case-sensitive after normalization: a session never
/// reports two records with the same url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRecord {
    /// Absolute URL of the feed itself.
    pub url: String,
    /// Syndication format the content was recognized as.
    pub kind: FeedKind,
    /// Feed title if one could be determined.
    pub title: Option<String>,
    /// Which strategy found it first.
    pub discovered_by: Strategy,
}

/// Why a strategy or session stopped before exhausting its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured maximum number of feeds was reached.
    MaxFeeds,
    /// The error budget was exhausted.
    MaxErrors,
    /// The crawler's page budget was exhausted.
    MaxLinks,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::MaxFeeds => write!(f, "maximum feeds reached"),
            StopReason::MaxErrors => write!(f, "error limit reached"),
            StopReason::MaxLinks => write!(f, "link limit reached"),
        }
    }
}

/// Immutable configuration for one search session.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum crawl depth in hops from the root (deep search).
    pub depth: u32,
    /// Maximum number of pages the crawler will visit.
    pub max_links: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Append the site URL's query string to blind-search candidates.
    pub keep_query_params: bool,
    /// Probe links on foreign domains for feeds (never crawl them).
    pub check_foreign_feeds: bool,
    /// Errors tolerated by the crawler before it drains and stops.
    pub max_errors: usize,
    /// Stop after this many feeds. 0 = unlimited.
    pub max_feeds: usize,
    /// Stop at the first strategy that yields feeds (inverse of `--all`).
    pub stop_at_first: bool,
    /// Crawler worker count.
    pub concurrency: usize,
    /// Surface non-fatal per-candidate failures as error events.
    pub show_errors: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            depth: 3,
            max_links: 1000,
            timeout: Duration::from_secs(5),
            keep_query_params: false,
            check_foreign_feeds: false,
            max_errors: 5,
            max_feeds: 0,
            stop_at_first: true,
            concurrency: 5,
            show_errors: false,
        }
    }
}

impl SearchOptions {
    /// Rejects configurations that indicate a caller bug rather than an
    /// environmental condition.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.concurrency == 0 {
            return Err(SearchError::InvalidOptions(
                "concurrency must be at least 1".to_owned(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(SearchError::InvalidOptions(
                "timeout must be non-zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Whether the feed budget is enabled and met by `count`.
    pub(crate) fn feed_budget_reached(&self, count: usize) -> bool {
        self.max_feeds > 0 && count >= self.max_feeds
    }
}

/// Errors that indicate the search could not run at all.
///
/// Environmental failures (timeouts, unreachable hosts, malformed pages) are
/// never errors; strategies absorb them and report partial results.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The site argument could not be turned into an absolute URL.
    #[error("Invalid site URL: {0}")]
    InvalidSite(#[from] url::ParseError),
    /// The site URL has no http(s) origin to search.
    #[error("Site URL must be http or https: {0}")]
    UnsupportedScheme(String),
    /// The options fail basic validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        assert!(SearchOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_a_contract_violation() {
        let options = SearchOptions {
            concurrency: 0,
            ..SearchOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(SearchError::InvalidOptions(_))
        ));
    }

    #[test]
    fn zero_timeout_is_a_contract_violation() {
        let options = SearchOptions {
            timeout: Duration::ZERO,
            ..SearchOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn feed_budget_disabled_at_zero() {
        let options = SearchOptions::default();
        assert!(!options.feed_budget_reached(10_000));

        let bounded = SearchOptions {
            max_feeds: 3,
            ..SearchOptions::default()
        };
        assert!(!bounded.feed_budget_reached(2));
        assert!(bounded.feed_budget_reached(3));
    }

    #[test]
    fn feed_record_serializes_with_lowercase_kind() {
        let record = FeedRecord {
            url: "https://example.com/feed.xml".to_owned(),
            kind: FeedKind::Rss,
            title: Some("Feed".to_owned()),
            discovered_by: Strategy::MetaLinks,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "rss");
        assert_eq!(json["discovered_by"], "meta_links");
    }
}
