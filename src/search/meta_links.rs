//! Meta search: `<link>` declarations that advertise a feed.
//!
//! The cheapest strategy: no network probing at all. The declared `type`
//! attribute is trusted, with href-extension sniffing as a fallback, so a page
//! that lies about its feeds produces wrong-kind records rather than extra
//! requests.

use url::Url;

use super::events::ProgressSink;
use super::{FeedRecord, SearchOptions, Strategy};
use crate::classify::{clean_title, FeedKind};
use crate::html::{self, LinkTag};

/// MIME subtypes (under `application/`) that declare a feed, checked in this
/// order.
const FEED_MIME_SUBTYPES: &[&str] = &["feed+json", "rss+xml", "atom+xml", "xml", "rdf+xml"];

/// Href substrings that make a plain `rel="alternate"` link feed-like.
const FEED_HREF_PATTERNS: &[&str] =
    &["/rss", "/feed", "/atom", ".rss", ".atom", ".xml", ".json"];

/// Scans the document's `<link>` declarations for feeds.
///
/// Deduplicates by resolved absolute URL within this scan. Relative hrefs are
/// resolved against the site URL. Links whose href cannot be resolved are
/// skipped.
pub fn meta_links(
    site: &Url,
    document: &str,
    _options: &SearchOptions,
    sink: &ProgressSink,
) -> Vec<FeedRecord> {
    sink.started(Strategy::MetaLinks);

    let links = html::link_tags(document);
    let mut feeds: Vec<FeedRecord> = Vec::new();

    let mut add = |link: &LinkTag| {
        let Some(href) = link.href.as_deref() else {
            return;
        };
        let Some(url) = resolve(site, href) else {
            return;
        };
        if feeds.iter().any(|f| f.url == url) {
            return;
        }
        let title = link
            .title
            .as_deref()
            .map(clean_title)
            .filter(|t| !t.is_empty());
        let record = FeedRecord {
            url,
            kind: feed_kind(link),
            title,
            discovered_by: Strategy::MetaLinks,
        };
        sink.feed_found(Strategy::MetaLinks, &record);
        feeds.push(record);
    };

    // Declared feed types first, in catalog order.
    for subtype in FEED_MIME_SUBTYPES {
        let mime = format!("application/{subtype}");
        for link in links.iter().filter(|l| {
            l.link_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(&mime))
        }) {
            add(link);
        }
    }

    // Then alternate links with a feed-looking href.
    for link in links.iter().filter(|l| {
        l.rel
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("alternate"))
    }) {
        let looks_like_feed = link.href.as_deref().is_some_and(|href| {
            let href = href.to_ascii_lowercase();
            FEED_HREF_PATTERNS.iter().any(|p| href.contains(p))
        });
        if looks_like_feed {
            add(link);
        }
    }

    sink.finished(Strategy::MetaLinks, &feeds, None);
    feeds
}

fn resolve(site: &Url, href: &str) -> Option<String> {
    site.join(href).ok().map(|u| u.to_string())
}

/// Kind from the declared type attribute, falling back to href-extension
/// sniffing, defaulting to RSS.
fn feed_kind(link: &LinkTag) -> FeedKind {
    if let Some(mime) = link.link_type.as_deref() {
        let mime = mime.to_ascii_lowercase();
        if mime.contains("rss") {
            return FeedKind::Rss;
        }
        if mime.contains("atom") {
            return FeedKind::Atom;
        }
        if mime.contains("json") {
            return FeedKind::Json;
        }
        if mime.contains("xml") {
            return FeedKind::Rss;
        }
    }
    if let Some(href) = link.href.as_deref() {
        let href = href.to_ascii_lowercase();
        if href.contains(".rss") || href.contains(".xml") {
            return FeedKind::Rss;
        }
        if href.contains(".atom") {
            return FeedKind::Atom;
        }
        if href.contains(".json") {
            return FeedKind::Json;
        }
    }
    FeedKind::Rss
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(document: &str) -> Vec<FeedRecord> {
        let site = Url::parse("https://example.com").unwrap();
        meta_links(
            &site,
            document,
            &SearchOptions::default(),
            &ProgressSink::disabled(),
        )
    }

    #[test]
    fn declared_rss_link_yields_exactly_one_record() {
        let document = r#"<html><head>
            <link type="application/rss+xml" href="/feed.xml" title="Feed">
        </head></html>"#;
        let feeds = scan(document);
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/feed.xml");
        assert_eq!(feeds[0].kind, FeedKind::Rss);
        assert_eq!(feeds[0].title.as_deref(), Some("Feed"));
        assert_eq!(feeds[0].discovered_by, Strategy::MetaLinks);
    }

    #[test]
    fn kind_follows_the_declared_type() {
        let document = r#"<head>
            <link type="application/atom+xml" href="/a">
            <link type="application/feed+json" href="/j">
            <link type="application/rdf+xml" href="/r">
        </head>"#;
        let feeds = scan(document);
        let kind_of = |url: &str| {
            feeds
                .iter()
                .find(|f| f.url.ends_with(url))
                .map(|f| f.kind)
                .unwrap()
        };
        assert_eq!(kind_of("/a"), FeedKind::Atom);
        assert_eq!(kind_of("/j"), FeedKind::Json);
        // rdf+xml has no rss/atom/json token; xml falls back to rss
        assert_eq!(kind_of("/r"), FeedKind::Rss);
    }

    #[test]
    fn alternate_link_with_feed_href_is_picked_up() {
        let document = r#"<head><link rel="alternate" href="/news/feed" title="News"></head>"#;
        let feeds = scan(document);
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].url, "https://example.com/news/feed");
        // No type attribute and no telling extension: defaults to rss
        assert_eq!(feeds[0].kind, FeedKind::Rss);
    }

    #[test]
    fn alternate_link_kind_sniffed_from_extension() {
        let document = r#"<head>
            <link rel="alternate" href="/updates.atom">
            <link rel="alternate" href="/updates.json">
        </head>"#;
        let feeds = scan(document);
        assert_eq!(feeds[0].kind, FeedKind::Atom);
        assert_eq!(feeds[1].kind, FeedKind::Json);
    }

    #[test]
    fn alternate_link_without_feed_pattern_is_ignored() {
        let document = r#"<head><link rel="alternate" hreflang="de" href="/de/start"></head>"#;
        assert_eq!(scan(document), Vec::new());
    }

    #[test]
    fn stylesheet_links_are_ignored() {
        let document = r#"<head><link rel="stylesheet" href="/style.xml.css"></head>"#;
        // ".xml" substring in a stylesheet href must not matter without
        // rel=alternate or a feed type
        assert_eq!(scan(document), Vec::new());
    }

    #[test]
    fn same_feed_declared_twice_is_reported_once() {
        let document = r#"<head>
            <link type="application/rss+xml" href="/feed.xml" title="Feed">
            <link rel="alternate" href="/feed.xml">
        </head>"#;
        let feeds = scan(document);
        assert_eq!(feeds.len(), 1);
        // First declaration's metadata wins
        assert_eq!(feeds[0].title.as_deref(), Some("Feed"));
    }

    #[test]
    fn absolute_hrefs_kept_absolute() {
        let document =
            r#"<head><link type="application/rss+xml" href="https://cdn.example.net/feed"></head>"#;
        let feeds = scan(document);
        assert_eq!(feeds[0].url, "https://cdn.example.net/feed");
    }

    #[test]
    fn titles_are_cleaned() {
        let document = "<head><link type=\"application/rss+xml\" href=\"/f\" title=\"  Two\n  Lines \"></head>";
        let feeds = scan(document);
        assert_eq!(feeds[0].title.as_deref(), Some("Two Lines"));
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert_eq!(scan(""), Vec::new());
    }
}
