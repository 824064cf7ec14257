//! Anchor search: probe every link already present on the page.
//!
//! No guessing about which anchors "look like" feeds: every same-domain
//! anchor is fetched and classified, bounded by `max_feeds` and the per-call
//! timeout. Anchor text makes a serviceable title when the feed itself
//! carries none.

use std::collections::HashSet;

use url::Url;

use super::events::ProgressSink;
use super::{FeedRecord, SearchOptions, StopReason, Strategy};
use crate::classify::{self, clean_title};
use crate::fetch::{self, ProbeOutcome};
use crate::html;
use crate::util::same_registrable_domain;

/// How an anchor's href relates to the site.
enum HrefClass {
    /// Absolute http(s) URL.
    Absolute(Url),
    /// Relative path, resolvable against the base.
    Relative,
    /// mailto:, javascript:, tel:, and the like. Skipped outright.
    UnsupportedScheme,
}

fn classify_href(href: &str) -> HrefClass {
    match Url::parse(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => HrefClass::Absolute(url),
        Ok(_) => HrefClass::UnsupportedScheme,
        Err(_) => HrefClass::Relative,
    }
}

/// Probes every anchor of the document for feeds.
///
/// Follows at most one `<meta http-equiv="refresh">` hop before scanning,
/// re-fetching the target and replacing the working document; a failed hop
/// falls back to the original document. Foreign-domain anchors are skipped
/// before any network round trip unless `check_foreign_feeds` is set.
pub async fn anchor_search(
    client: &reqwest::Client,
    site: &Url,
    document: &str,
    options: &SearchOptions,
    sink: &ProgressSink,
) -> Vec<FeedRecord> {
    sink.started(Strategy::Anchors);

    let (document, base) = follow_meta_refresh(client, site, document, options).await;
    let anchors = html::anchor_tags(&document);
    let total = anchors.len();

    let mut feeds: Vec<FeedRecord> = Vec::new();
    let mut probed: HashSet<String> = HashSet::new();

    for (i, anchor) in anchors.iter().enumerate() {
        if options.feed_budget_reached(feeds.len()) {
            sink.milestone(
                Strategy::Anchors,
                format!(
                    "Stopped: {} ({} feeds found, max {} allowed)",
                    StopReason::MaxFeeds,
                    feeds.len(),
                    options.max_feeds
                ),
            );
            break;
        }
        sink.progress(Strategy::Anchors, i + 1, Some(total));

        let candidate = match classify_href(&anchor.href) {
            HrefClass::Absolute(url) => url,
            HrefClass::Relative => match base.join(&anchor.href) {
                Ok(url) => url,
                Err(_) => {
                    if options.show_errors {
                        sink.failure(
                            Strategy::Anchors,
                            format!("Invalid relative URL: {}", anchor.href),
                        );
                    }
                    continue;
                }
            },
            HrefClass::UnsupportedScheme => continue,
        };

        if !options.check_foreign_feeds && !same_registrable_domain(&candidate, site) {
            continue;
        }

        let url = candidate.to_string();
        if !probed.insert(url.clone()) {
            continue;
        }

        match classify::probe(client, &url, options.timeout).await {
            ProbeOutcome::Feed(info) => {
                let anchor_title = clean_title(&anchor.text);
                let title = info
                    .title
                    .or_else(|| (!anchor_title.is_empty()).then_some(anchor_title));
                let record = FeedRecord {
                    url,
                    kind: info.kind,
                    title,
                    discovered_by: Strategy::Anchors,
                };
                sink.feed_found(Strategy::Anchors, &record);
                feeds.push(record);
            }
            ProbeOutcome::NotFeed => {}
            ProbeOutcome::Unavailable => {
                if options.show_errors {
                    sink.failure(Strategy::Anchors, format!("Error fetching {url}"));
                }
            }
        }
    }

    sink.finished(Strategy::Anchors, &feeds, None);
    feeds
}

/// Follows a single meta-refresh redirect, if the document declares one.
///
/// Returns the working document and the base URL anchors resolve against.
async fn follow_meta_refresh(
    client: &reqwest::Client,
    site: &Url,
    document: &str,
    options: &SearchOptions,
) -> (String, Url) {
    let Some(target) = html::meta_refresh_target(document) else {
        return (document.to_owned(), site.clone());
    };
    let Ok(target_url) = site.join(&target) else {
        return (document.to_owned(), site.clone());
    };

    tracing::debug!(target = %target_url, "Following meta refresh");
    let Some(response) = fetch::fetch_page(client, target_url.as_str(), options.timeout).await
    else {
        return (document.to_owned(), site.clone());
    };
    if !response.status().is_success() {
        return (document.to_owned(), site.clone());
    }
    match fetch::read_limited_text(response).await {
        Some(body) => (body, target_url),
        None => (document.to_owned(), site.clone()),
    }
}
