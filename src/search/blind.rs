//! Blind search: probing a catalog of historically common feed endpoints.
//!
//! No page content is read. The site URL is walked up one path segment at a
//! time until the origin, and at every level each catalog entry is appended
//! and probed. Candidate order is fully deterministic: most specific path
//! first, catalog order within a level.

use url::Url;

use super::events::ProgressSink;
use super::{FeedRecord, SearchOptions, StopReason, Strategy};
use crate::classify::{self, FeedKind};
use crate::fetch::ProbeOutcome;

/// Common feed endpoint paths, tried at every path level.
///
/// Order is a design constant; tests and progress totals depend on it.
const FEED_ENDPOINTS: &[&str] = &[
    "&_rss=1",       // ebay
    ".rss",          // e.g. Reddit
    "/blog?format=rss", // Squarespace
    "/?format=feed", // Joomla
    "/index.php?format=feed", // Joomla
    "api/rss.xml",   // API endpoints
    "atom.xml",
    "blog-feed.xml", // WIX sites
    "catalog.xml",   // product catalogs
    "deals.xml",     // deal/sale feeds
    "episodes.rss",  // episodic content
    "events.rss",    // calendar events
    "extern.php?action=feed&type=atom",
    "export/rss.xml", // export directories
    "external?type=rss2",
    "feed",
    "feed.aspx", // ASP.NET feeds
    "feed.cml",  // Wix, Webflow
    "feed/atom",
    "feed/atom.rss",
    "feed/atom.xml",
    "feed/rdf",
    "feed/rss/",
    "feed/rss.xml",
    "feed/rss2",
    "feeds",
    "forum.rss",   // forum posts
    "gallery.rss", // image galleries
    "index.php?action=.xml;type=rss",
    "index.rss",
    "index.xml",
    "inventory.rss", // inventory updates
    "jobs.rss",      // job listings
    "latest/feed",
    "latest.rss",
    "news.xml",
    "podcast.rss", // audio content
    "posts.rss",
    "products.rss",    // product feeds
    "public/feed.xml", // public feeds
    "rss",
    "rss.aspx", // ASP.NET sites
    "rss.cfm",  // ColdFusion sites
    "rss.php",
    "rss/news/rss.xml",
    "rss/rss.php",
    "rssfeed.rdf",
    "rssfeed.xml",
    "rss.xml", // the most often used file name by far
    "sitenews",
    "spip.php?page=backend",
    "spip.php?page=backend-breve",
    "spip.php?page=backend-sites",
    "syndicate/rss.xml",
    "syndication.php",
    "videos.rss", // video content
    "xml",
];

/// Builds the full candidate list: every catalog entry at every path level
/// from the site's path down to its origin.
fn generate_candidates(site: &Url, keep_query_params: bool) -> Vec<String> {
    let origin = site.origin().ascii_serialization();
    let query = if keep_query_params {
        site.query().map(|q| format!("?{q}")).unwrap_or_default()
    } else {
        String::new()
    };

    // Trailing slash stripped up front so the origin level is emitted once.
    let mut path = format!("{}{}", origin, site.path());
    while path.ends_with('/') {
        path.pop();
    }
    let mut candidates = Vec::new();

    while path.len() >= origin.len() {
        for endpoint in FEED_ENDPOINTS {
            candidates.push(format!("{path}/{endpoint}{query}"));
        }
        match path.rfind('/') {
            Some(cut) => path.truncate(cut),
            None => break,
        }
    }

    candidates
}

/// Probes the endpoint catalog against every path level of the site.
///
/// With `stop_at_first`, probing stops once at least one RSS and one Atom
/// feed have each been seen; a JSON feed alone never triggers the stop. With
/// `max_feeds > 0`, probing stops unconditionally at that many feeds.
/// Per-candidate failures are swallowed (surfaced as error events only with
/// `show_errors`); progress is emitted after every candidate.
pub async fn blind_search(
    client: &reqwest::Client,
    site: &Url,
    options: &SearchOptions,
    sink: &ProgressSink,
) -> Vec<FeedRecord> {
    sink.started(Strategy::Blind);

    let candidates = generate_candidates(site, options.keep_query_params);
    let total = candidates.len();
    sink.progress(Strategy::Blind, 0, Some(total));

    let mut feeds: Vec<FeedRecord> = Vec::new();
    let mut rss_found = false;
    let mut atom_found = false;

    for (i, url) in candidates.iter().enumerate() {
        if options.stop_at_first && rss_found && atom_found {
            break;
        }

        match classify::probe(client, url, options.timeout).await {
            ProbeOutcome::Feed(info) => {
                if !feeds.iter().any(|f| f.url == *url) {
                    match info.kind {
                        FeedKind::Rss => rss_found = true,
                        FeedKind::Atom => atom_found = true,
                        FeedKind::Json => {}
                    }
                    let record = FeedRecord {
                        url: url.clone(),
                        kind: info.kind,
                        title: info.title,
                        discovered_by: Strategy::Blind,
                    };
                    sink.feed_found(Strategy::Blind, &record);
                    feeds.push(record);

                    if options.feed_budget_reached(feeds.len()) {
                        sink.milestone(
                            Strategy::Blind,
                            format!(
                                "Stopped: {} ({} feeds found, max {} allowed)",
                                StopReason::MaxFeeds,
                                feeds.len(),
                                options.max_feeds
                            ),
                        );
                        sink.progress(Strategy::Blind, i + 1, Some(total));
                        break;
                    }
                }
            }
            ProbeOutcome::NotFeed => {}
            ProbeOutcome::Unavailable => {
                if options.show_errors {
                    sink.failure(Strategy::Blind, format!("Error fetching {url}"));
                }
            }
        }

        sink.progress(Strategy::Blind, i + 1, Some(total));
    }

    sink.finished(Strategy::Blind, &feeds, None);
    feeds
}
