//! The search orchestrator.
//!
//! A [`SearchSession`] normalizes the site URL once, fetches the root document
//! lazily (shared by the three document strategies), and runs strategies in
//! priority order under the session-wide budget policy. Results merge into one
//! deduplicated list; the first discovery of a URL keeps its metadata.

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::OnceCell;
use url::Url;

use super::events::{ProgressSink, SearchEvent};
use super::{
    anchors, blind, crawler, meta_links, FeedRecord, SearchError, SearchOptions, StopReason,
    Strategy,
};
use crate::fetch;

/// Which strategies a session run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Run exactly one strategy.
    Exclusive(Strategy),
    /// Run {meta, anchors, blind} in priority order, plus the crawler when
    /// `deep` is set, under the stop-at-first/accumulation rules.
    Standard { deep: bool },
}

/// Final result of a session run.
#[derive(Debug)]
pub struct SearchReport {
    /// Deduplicated feeds in discovery order.
    pub feeds: Vec<FeedRecord>,
    /// Pages the crawler fetched, when it ran.
    pub pages_visited: usize,
    /// Set when a budget ended the run early. Zero feeds with `stopped: None`
    /// means every enabled strategy ran to completion and found nothing.
    pub stopped: Option<StopReason>,
}

/// One feed search over one site.
///
/// The session owns the normalized site URL, the shared HTTP client, and the
/// event sink. Strategies can also be invoked individually; each returns its
/// own feed list and reports lifecycle events.
pub struct SearchSession {
    site: Url,
    options: SearchOptions,
    client: reqwest::Client,
    sink: ProgressSink,
    root: OnceCell<String>,
}

impl SearchSession {
    /// Creates a session for `site`, which may be a bare host; the scheme
    /// defaults to https.
    ///
    /// # Errors
    ///
    /// Fails on an unparseable or non-http(s) site URL, invalid options, or
    /// an HTTP client setup failure. All are caller bugs or fatal environment
    /// problems, not per-candidate conditions.
    pub fn new(
        site: &str,
        options: SearchOptions,
        events: Option<UnboundedSender<SearchEvent>>,
    ) -> Result<Self, SearchError> {
        options.validate()?;
        let site = normalize_site(site)?;
        let client = fetch::build_client()?;
        Ok(Self {
            site,
            options,
            client,
            sink: events.map(ProgressSink::new).unwrap_or_default(),
            root: OnceCell::new(),
        })
    }

    /// The normalized site URL the session searches.
    pub fn site(&self) -> &Url {
        &self.site
    }

    /// Runs the session in the given mode.
    pub async fn run(&self, mode: SearchMode) -> SearchReport {
        match mode {
            SearchMode::Exclusive(strategy) => {
                let (feeds, pages_visited, stopped) = self.run_strategy(strategy).await;
                let stopped = stopped.or_else(|| {
                    self.options
                        .feed_budget_reached(feeds.len())
                        .then_some(StopReason::MaxFeeds)
                });
                SearchReport {
                    feeds,
                    pages_visited,
                    stopped,
                }
            }
            SearchMode::Standard { deep } => self.run_standard(deep).await,
        }
    }

    /// Scans `<link>` declarations of the root document. No probing.
    pub async fn meta_links(&self) -> Vec<FeedRecord> {
        let document = self.root_document().await;
        meta_links::meta_links(&self.site, document, &self.options, &self.sink)
    }

    /// Probes every same-domain anchor of the root document.
    pub async fn anchors(&self) -> Vec<FeedRecord> {
        let document = self.root_document().await;
        anchors::anchor_search(&self.client, &self.site, document, &self.options, &self.sink)
            .await
    }

    /// Probes the endpoint catalog at every path level of the site.
    pub async fn blind(&self) -> Vec<FeedRecord> {
        blind::blind_search(&self.client, &self.site, &self.options, &self.sink).await
    }

    /// Crawls the site, probing every discovered link.
    pub async fn deep(&self) -> crawler::CrawlOutcome {
        crawler::deep_search(&self.client, &self.site, &self.options, &self.sink).await
    }

    /// Fetches the root document once; later callers share the result.
    ///
    /// A failed root fetch yields an empty document (and an error event) so
    /// the document strategies still run; the crawler fetches for itself
    /// anyway.
    async fn root_document(&self) -> &str {
        self.root
            .get_or_init(|| async {
                match fetch::fetch_page(&self.client, self.site.as_str(), self.options.timeout)
                    .await
                {
                    Some(response) if response.status().is_success() => {
                        fetch::read_limited_text(response).await.unwrap_or_default()
                    }
                    Some(response) => {
                        self.sink.failure(
                            None,
                            format!("Failed to fetch {}: HTTP {}", self.site, response.status()),
                        );
                        String::new()
                    }
                    None => {
                        self.sink
                            .failure(None, format!("Failed to fetch {}", self.site));
                        String::new()
                    }
                }
            })
            .await
    }

    async fn run_strategy(
        &self,
        strategy: Strategy,
    ) -> (Vec<FeedRecord>, usize, Option<StopReason>) {
        match strategy {
            Strategy::MetaLinks => (self.meta_links().await, 0, None),
            Strategy::Anchors => (self.anchors().await, 0, None),
            Strategy::Blind => (self.blind().await, 0, None),
            Strategy::Deep => {
                let outcome = self.deep().await;
                (outcome.feeds, outcome.pages_visited, outcome.stopped)
            }
        }
    }

    async fn run_standard(&self, deep: bool) -> SearchReport {
        let mut strategies = vec![Strategy::MetaLinks, Strategy::Anchors, Strategy::Blind];
        if deep {
            strategies.push(Strategy::Deep);
        }

        let mut merged: Vec<FeedRecord> = Vec::new();
        let mut pages_visited = 0;
        let mut stopped = None;

        for strategy in strategies {
            let (feeds, visited, strategy_stop) = self.run_strategy(strategy).await;
            merge_by_url(&mut merged, feeds);
            pages_visited += visited;
            if stopped.is_none() {
                stopped = strategy_stop;
            }

            if self.options.max_feeds > 0 {
                // Budgeted accumulation: keep running strategies until the
                // shared list reaches the cap, truncating at the boundary.
                if merged.len() >= self.options.max_feeds {
                    merged.truncate(self.options.max_feeds);
                    stopped = Some(StopReason::MaxFeeds);
                    break;
                }
            } else if self.options.stop_at_first && !merged.is_empty() {
                break;
            }
        }

        SearchReport {
            feeds: merged,
            pages_visited,
            stopped,
        }
    }
}

/// Appends feeds whose URL is not in the list yet; first discovery wins.
fn merge_by_url(merged: &mut Vec<FeedRecord>, feeds: Vec<FeedRecord>) {
    for feed in feeds {
        if !merged.iter().any(|m| m.url == feed.url) {
            merged.push(feed);
        }
    }
}

/// Normalizes the site argument: scheme defaulted to https, URL parsed into
/// canonical form.
fn normalize_site(site: &str) -> Result<Url, SearchError> {
    let with_scheme = if site.contains("://") {
        site.to_owned()
    } else {
        format!("https://{site}")
    };
    let url = Url::parse(&with_scheme)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SearchError::UnsupportedScheme(url.scheme().to_owned()));
    }
    Ok(url)
}
