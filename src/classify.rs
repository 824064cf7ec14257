//! Feed content classification.
//!
//! Decides whether a blob of fetched content is an RSS, Atom, or JSON feed by
//! shallow sniffing, without full feed parsing. Precedence when multiple signals
//! match is RSS, then Atom, then JSON Feed, so an RSS document that happens to
//! contain an `<entry>` tag still classifies as RSS.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::fetch::{self, ProbeOutcome};

/// The syndication format a piece of content was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Rss,
    Atom,
    Json,
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::Rss => write!(f, "rss"),
            FeedKind::Atom => write!(f, "atom"),
            FeedKind::Json => write!(f, "json"),
        }
    }
}

/// Result of classifying a piece of content as a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedInfo {
    pub kind: FeedKind,
    /// Channel/feed-level title, cleaned. `None` when the document carries none.
    pub title: Option<String>,
}

static RSS_ROOT: LazyLock<Regex> = LazyLock::new(|| {
    // <rss ... version="2.0"> with any attributes before the version
    Regex::new(r#"(?i)<rss[^>]*\sversion\s*=\s*["'][\d.]+["']"#).unwrap()
});
static RSS_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<item[\s>]").unwrap());
static ATOM_ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<feed[^>]*xmlns\s*=\s*["']http://www\.w3\.org/2005/Atom["']"#).unwrap()
});
static ATOM_ENTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<entry[\s>]").unwrap());
static CHANNEL_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<channel[^>]*>(.*?)</channel>").unwrap());
static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static ITEM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item[\s>].*?</item>").unwrap());
static ENTRY_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<entry[\s>].*?</entry>").unwrap());
static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Classifies raw content as a feed.
///
/// Returns `None` when the content is not recognizable as any feed format.
/// Malformed XML/JSON is "not a feed", never an error.
pub fn classify(content: &str) -> Option<FeedInfo> {
    check_rss(content)
        .or_else(|| check_atom(content))
        .or_else(|| check_json(content))
}

/// Fetches a URL and classifies its body.
///
/// Network failure, a non-success HTTP status, and an oversized body all
/// resolve to [`ProbeOutcome::Unavailable`]; a reachable page that is not a
/// feed resolves to [`ProbeOutcome::NotFeed`].
pub async fn probe(client: &reqwest::Client, url: &str, timeout: Duration) -> ProbeOutcome {
    let Some(response) = fetch::fetch_page(client, url, timeout).await else {
        return ProbeOutcome::Unavailable;
    };
    if !response.status().is_success() {
        return ProbeOutcome::NotFeed;
    }
    let Some(body) = fetch::read_limited_text(response).await else {
        return ProbeOutcome::Unavailable;
    };
    match classify(&body) {
        Some(info) => ProbeOutcome::Feed(info),
        None => ProbeOutcome::NotFeed,
    }
}

/// Strips CDATA markers and normalizes whitespace in a title.
///
/// Idempotent: applying it twice yields the same string as applying it once.
/// CDATA removal runs to a fixpoint so nested wrappers cannot leave a complete
/// marker pair behind.
pub fn clean_title(title: &str) -> String {
    let mut text = title.to_string();
    loop {
        match CDATA.replace_all(&text, "$1") {
            std::borrow::Cow::Borrowed(_) => break,
            std::borrow::Cow::Owned(next) => text = next,
        }
    }
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// `clean_title` lifted over an optional raw title; empty results become `None`.
fn cleaned_non_empty(raw: Option<&str>) -> Option<String> {
    let cleaned = clean_title(raw?);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn check_rss(content: &str) -> Option<FeedInfo> {
    if !RSS_ROOT.is_match(content) && !RSS_ITEM.is_match(content) {
        return None;
    }
    Some(FeedInfo {
        kind: FeedKind::Rss,
        title: extract_rss_title(content),
    })
}

/// Channel title preferred over any item title: item blocks are cut out of
/// the search scope entirely, so document order does not matter.
fn extract_rss_title(content: &str) -> Option<String> {
    let scope = CHANNEL_BLOCK
        .captures(content)
        .and_then(|c| c.get(1))
        .map_or(content, |m| m.as_str());
    let without_items = ITEM_BLOCK.replace_all(scope, "");
    let raw = TITLE_TAG
        .captures(&without_items)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    cleaned_non_empty(raw)
}

fn check_atom(content: &str) -> Option<FeedInfo> {
    if !ATOM_ROOT.is_match(content) || !ATOM_ENTRY.is_match(content) {
        return None;
    }
    // Feed-level title: entry blocks are cut out of the search scope so an
    // entry title never masquerades as the feed title. A titleless document
    // is not treated as Atom at all.
    let without_entries = ENTRY_BLOCK.replace_all(content, "");
    let title = cleaned_non_empty(
        TITLE_TAG
            .captures(&without_entries)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
    )?;
    Some(FeedInfo {
        kind: FeedKind::Atom,
        title: Some(title),
    })
}

fn check_json(content: &str) -> Option<FeedInfo> {
    let json: Value = serde_json::from_str(content.trim()).ok()?;
    let obj = json.as_object()?;

    if is_oembed(obj) {
        return None;
    }

    let version_is_jsonfeed = obj
        .get("version")
        .and_then(Value::as_str)
        .is_some_and(|v| v.to_lowercase().contains("jsonfeed"));
    let has_items = obj.get("items").is_some_and(Value::is_array);
    let has_feed_url = obj.contains_key("feed_url");

    if !(version_is_jsonfeed || has_items || has_feed_url) {
        return None;
    }

    let title = obj
        .get("title")
        .or_else(|| obj.get("name"))
        .and_then(Value::as_str);
    Some(FeedInfo {
        kind: FeedKind::Json,
        title: cleaned_non_empty(title),
    })
}

/// oEmbed responses are JSON with `version` and `type` fields and would
/// otherwise sneak past the JSON Feed check on sites that serve them from
/// feed-looking URLs.
fn is_oembed(obj: &serde_json::Map<String, Value>) -> bool {
    let type_field = obj.get("type").and_then(Value::as_str);
    let has_version = obj.contains_key("version");

    let oembed_type = matches!(type_field, Some("rich" | "video" | "photo" | "link"));
    if oembed_type && has_version {
        return true;
    }
    type_field.is_some() && has_version && obj.contains_key("html")
}
