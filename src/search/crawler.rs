//! Deep search: breadth-first, depth-bounded, concurrency-bounded site crawl.
//!
//! A pool of workers drains a FIFO frontier of `{url, depth}` tasks. Every
//! link discovered on a parsed page is probed as a feed candidate in its own
//! right; same-domain links within the depth budget are also enqueued for
//! crawling. Shared state lives behind one mutex with short lock scopes,
//! never held across an await, and workers park on a `Notify` while work is
//! in flight elsewhere.
//!
//! Budgets: `max_errors` and `max_feeds` trigger a cooperative drain (the
//! frontier is cleared, in-flight fetches finish and their results are still
//! recorded); `max_links` bounds pages fetched, checked both before dequeue
//! and before enqueue. The bound is enforced at dequeue time under the lock,
//! so racing workers cannot push the visited count past it.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use url::Url;

use super::events::{PageStatus, ProgressSink, SearchEvent};
use super::{FeedRecord, SearchOptions, StopReason, Strategy};
use crate::classify;
use crate::fetch::{self, ProbeOutcome};
use crate::html;
use crate::util::same_registrable_domain;

/// File extensions never worth fetching during a crawl.
const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".zip", ".rar", ".7z", ".tar.gz", ".tar.bz2", ".tar.xz", ".tar", ".gz", ".bz2", ".xz",
    ".tgz", ".epub", ".mobi", ".azw", ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt",
    ".pptx", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".svg", ".mp3", ".mp4",
    ".avi", ".mov", ".wmv", ".mpg", ".mpeg", ".flv", ".mkv", ".webm", ".ogg", ".ogv", ".ogx",
];

/// Result of a finished crawl session.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub feeds: Vec<FeedRecord>,
    /// Pages dequeued and fetched (not candidate probes).
    pub pages_visited: usize,
    /// Fetch/probe failures encountered.
    pub errors: usize,
    /// Set when a budget ended the crawl before the frontier ran dry.
    pub stopped: Option<StopReason>,
}

struct CrawlTask {
    url: Url,
    depth: u32,
}

struct CrawlState {
    frontier: VecDeque<CrawlTask>,
    /// URLs currently waiting in the frontier.
    queued: HashSet<String>,
    /// URLs dequeued for fetching. Grows monotonically; checked before
    /// enqueue and again before dispatch.
    visited: HashSet<String>,
    /// Links already probed as feed candidates.
    probed: HashSet<String>,
    feeds: Vec<FeedRecord>,
    errors: usize,
    in_flight: usize,
    stopped: Option<StopReason>,
    link_budget_announced: bool,
}

struct CrawlShared {
    state: Mutex<CrawlState>,
    notify: Notify,
    client: reqwest::Client,
    options: SearchOptions,
    site: Url,
    sink: ProgressSink,
}

impl CrawlShared {
    fn state(&self) -> MutexGuard<'_, CrawlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the frontier so no new work is dispatched. In-flight tasks
    /// finish and their results are still recorded.
    fn drain(&self, st: &mut CrawlState, reason: StopReason) {
        if st.stopped.is_none() {
            st.stopped = Some(reason);
        }
        st.frontier.clear();
        st.queued.clear();
        self.notify.notify_waiters();
    }

    fn record_error(&self, st: &mut CrawlState, url: &str, depth: u32, message: String) {
        // Past the limit the session is already draining; stop counting.
        if st.errors >= self.options.max_errors {
            return;
        }
        st.errors += 1;
        self.sink.emit(SearchEvent::PageVisited {
            url: url.to_owned(),
            depth,
            status: PageStatus::Failed(message),
        });
        if st.errors >= self.options.max_errors {
            self.sink.milestone(
                Strategy::Deep,
                format!(
                    "Stopped: {} ({} errors, max {} allowed)",
                    StopReason::MaxErrors,
                    st.errors,
                    self.options.max_errors
                ),
            );
            self.drain(st, StopReason::MaxErrors);
        }
    }

    fn record_feed(&self, st: &mut CrawlState, record: FeedRecord, depth: u32) {
        if st.feeds.iter().any(|f| f.url == record.url) {
            return;
        }
        self.sink.emit(SearchEvent::PageVisited {
            url: record.url.clone(),
            depth,
            status: PageStatus::Feed,
        });
        self.sink.feed_found(Strategy::Deep, &record);
        st.feeds.push(record);
        if self.options.feed_budget_reached(st.feeds.len()) {
            self.sink.milestone(
                Strategy::Deep,
                format!(
                    "Stopped: {} ({} feeds found, max {} allowed)",
                    StopReason::MaxFeeds,
                    st.feeds.len(),
                    self.options.max_feeds
                ),
            );
            self.drain(st, StopReason::MaxFeeds);
        }
    }

    fn enqueue(&self, st: &mut CrawlState, url: Url, depth: u32) {
        if st.stopped.is_some() {
            return;
        }
        let key = url.to_string();
        if st.visited.contains(&key) || st.queued.contains(&key) {
            return;
        }
        if st.visited.len() >= self.options.max_links {
            self.announce_link_budget(st);
            return;
        }
        st.queued.insert(key);
        st.frontier.push_back(CrawlTask { url, depth });
        self.notify.notify_waiters();
    }

    fn announce_link_budget(&self, st: &mut CrawlState) {
        if !st.link_budget_announced {
            st.link_budget_announced = true;
            self.sink.milestone(
                Strategy::Deep,
                format!(
                    "Stopped: {} ({} pages, max {} allowed)",
                    StopReason::MaxLinks,
                    st.visited.len(),
                    self.options.max_links
                ),
            );
            if st.stopped.is_none() {
                st.stopped = Some(StopReason::MaxLinks);
            }
        }
    }
}

/// Crawls the site breadth-first, probing every discovered link for feeds.
///
/// Returns when the frontier is drained and no fetch is in flight.
pub async fn deep_search(
    client: &reqwest::Client,
    site: &Url,
    options: &SearchOptions,
    sink: &ProgressSink,
) -> CrawlOutcome {
    sink.started(Strategy::Deep);

    let shared = Arc::new(CrawlShared {
        state: Mutex::new(CrawlState {
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            probed: HashSet::new(),
            feeds: Vec::new(),
            errors: 0,
            in_flight: 0,
            stopped: None,
            link_budget_announced: false,
        }),
        notify: Notify::new(),
        client: client.clone(),
        options: options.clone(),
        site: site.clone(),
        sink: sink.clone(),
    });

    {
        let mut st = shared.state();
        let root = site.clone();
        st.queued.insert(root.to_string());
        st.frontier.push_back(CrawlTask {
            url: root,
            depth: 0,
        });
    }

    let workers: Vec<_> = (0..options.concurrency.max(1))
        .map(|_| {
            let shared = Arc::clone(&shared);
            tokio::spawn(worker(shared))
        })
        .collect();
    for handle in workers {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Crawl worker task failed");
        }
    }

    let st = shared.state();
    let outcome = CrawlOutcome {
        feeds: st.feeds.clone(),
        pages_visited: st.visited.len(),
        errors: st.errors,
        stopped: st.stopped,
    };
    drop(st);

    sink.finished(Strategy::Deep, &outcome.feeds, Some(outcome.pages_visited));
    outcome
}

async fn worker(shared: Arc<CrawlShared>) {
    while let Some(task) = next_task(&shared).await {
        crawl_page(&shared, &task).await;
        {
            let mut st = shared.state();
            st.in_flight -= 1;
        }
        shared.notify.notify_waiters();
    }
    // Wake siblings so they can observe the drained queue and exit too.
    shared.notify.notify_waiters();
}

/// Claims the next crawlable task, or `None` when the crawl is over.
///
/// The visited check and insertion happen under one lock acquisition, so a
/// URL is dispatched at most once no matter how workers race.
async fn next_task(shared: &CrawlShared) -> Option<CrawlTask> {
    loop {
        let notified = shared.notify.notified();
        tokio::pin!(notified);
        // Register before inspecting state so a notify between the check and
        // the await below is not lost.
        notified.as_mut().enable();

        {
            let mut st = shared.state();
            while let Some(task) = st.frontier.pop_front() {
                let key = task.url.to_string();
                st.queued.remove(&key);
                if task.depth > shared.options.depth {
                    continue;
                }
                if st.visited.contains(&key) {
                    continue;
                }
                if st.visited.len() >= shared.options.max_links {
                    shared.announce_link_budget(&mut st);
                    continue;
                }
                st.visited.insert(key);
                st.in_flight += 1;
                return Some(task);
            }
            if st.in_flight == 0 {
                return None;
            }
        }

        notified.await;
    }
}

async fn crawl_page(shared: &CrawlShared, task: &CrawlTask) {
    let url_str = task.url.to_string();
    let options = &shared.options;

    let Some(response) = fetch::fetch_page(&shared.client, &url_str, options.timeout).await else {
        let mut st = shared.state();
        shared.record_error(
            &mut st,
            &url_str,
            task.depth,
            "timeout or network error".to_owned(),
        );
        return;
    };
    let status = response.status();
    if !status.is_success() {
        let mut st = shared.state();
        shared.record_error(&mut st, &url_str, task.depth, format!("HTTP {status}"));
        return;
    }
    let Some(body) = fetch::read_limited_text(response).await else {
        let mut st = shared.state();
        shared.record_error(&mut st, &url_str, task.depth, "body read failed".to_owned());
        return;
    };

    {
        let st = shared.state();
        shared
            .sink
            .progress(Strategy::Deep, st.visited.len(), None);
    }

    for anchor in html::anchor_tags(&body) {
        let Some(mut link) = resolve_link(&task.url, &anchor.href) else {
            continue;
        };
        link.set_fragment(None);
        let key = link.to_string();

        if has_excluded_extension(&key) {
            continue;
        }

        let same_domain = same_registrable_domain(&link, &shared.site);

        let should_probe = {
            let mut st = shared.state();
            if st.stopped.is_some() {
                return;
            }
            (same_domain || options.check_foreign_feeds)
                && !st.visited.contains(&key)
                && st.probed.insert(key.clone())
        };

        if should_probe {
            match classify::probe(&shared.client, &key, options.timeout).await {
                ProbeOutcome::Feed(info) => {
                    let record = FeedRecord {
                        url: key.clone(),
                        kind: info.kind,
                        title: info.title,
                        discovered_by: Strategy::Deep,
                    };
                    let mut st = shared.state();
                    shared.record_feed(&mut st, record, task.depth + 1);
                    if st.stopped.is_some() {
                        return;
                    }
                }
                ProbeOutcome::NotFeed => {
                    shared.sink.emit(SearchEvent::PageVisited {
                        url: key.clone(),
                        depth: task.depth + 1,
                        status: PageStatus::NotFeed,
                    });
                }
                ProbeOutcome::Unavailable => {
                    let mut st = shared.state();
                    shared.record_error(
                        &mut st,
                        &key,
                        task.depth + 1,
                        "candidate fetch failed".to_owned(),
                    );
                    if st.stopped.is_some() {
                        return;
                    }
                }
            }
        }

        if same_domain && task.depth + 1 <= options.depth {
            let mut st = shared.state();
            shared.enqueue(&mut st, link, task.depth + 1);
        }
    }
}

/// Absolute http(s) form of an anchor href, or `None` for unsupported schemes
/// and unresolvable relatives.
fn resolve_link(page: &Url, href: &str) -> Option<Url> {
    match Url::parse(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(_) => None,
        Err(_) => page.join(href).ok().filter(|u| matches!(u.scheme(), "http" | "https")),
    }
}

fn has_excluded_extension(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    EXCLUDED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
