//! Search lifecycle events.
//!
//! The orchestrator and every strategy report progress through a
//! [`ProgressSink`]. The sink wraps an optional unbounded channel sender: with
//! no listener attached every emission is a no-op, and a dropped receiver
//! never stalls or fails a search. This is the seam between the search core
//! and any presentation layer.

use tokio::sync::mpsc::UnboundedSender;

use super::{FeedRecord, Strategy};

/// What happened to a page the crawler visited or a link it probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    /// The URL serves a feed.
    Feed,
    /// Fetched and parsed, not a feed.
    NotFeed,
    /// Fetch or read failed; the message says how.
    Failed(String),
}

/// One step in a search session's lifecycle.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    /// A strategy is starting.
    Started { strategy: Strategy },
    /// A candidate was checked; `total` is known for finite candidate lists
    /// so consumers can render an ETA.
    Progress {
        strategy: Strategy,
        checked: usize,
        total: Option<usize>,
    },
    /// The crawler finished with one page or probed one link.
    PageVisited {
        url: String,
        depth: u32,
        status: PageStatus,
    },
    /// A feed was discovered.
    FeedFound { strategy: Strategy, feed: FeedRecord },
    /// A budget was hit or another notable state change occurred.
    Milestone { strategy: Strategy, message: String },
    /// A non-fatal failure, surfaced only where the strategy surfaces errors.
    /// `strategy` is `None` for session-level failures (e.g. the root fetch).
    Failure {
        strategy: Option<Strategy>,
        message: String,
    },
    /// A strategy finished. `pages_visited` is reported by the crawler.
    Finished {
        strategy: Strategy,
        feeds: Vec<FeedRecord>,
        pages_visited: Option<usize>,
    },
}

/// Emits [`SearchEvent`]s to an optional listener.
///
/// Cloneable and cheap; strategies and crawler workers each hold one.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<SearchEvent>>,
}

impl ProgressSink {
    /// A sink delivering events to `tx`.
    pub fn new(tx: UnboundedSender<SearchEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Sends an event. A missing or disconnected listener is fine.
    pub fn emit(&self, event: SearchEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn started(&self, strategy: Strategy) {
        self.emit(SearchEvent::Started { strategy });
    }

    pub fn progress(&self, strategy: Strategy, checked: usize, total: Option<usize>) {
        self.emit(SearchEvent::Progress {
            strategy,
            checked,
            total,
        });
    }

    pub fn feed_found(&self, strategy: Strategy, feed: &FeedRecord) {
        self.emit(SearchEvent::FeedFound {
            strategy,
            feed: feed.clone(),
        });
    }

    pub fn milestone(&self, strategy: Strategy, message: impl Into<String>) {
        self.emit(SearchEvent::Milestone {
            strategy,
            message: message.into(),
        });
    }

    pub fn failure(&self, strategy: impl Into<Option<Strategy>>, message: impl Into<String>) {
        self.emit(SearchEvent::Failure {
            strategy: strategy.into(),
            message: message.into(),
        });
    }

    pub fn finished(
        &self,
        strategy: Strategy,
        feeds: &[FeedRecord],
        pages_visited: Option<usize>,
    ) {
        self.emit(SearchEvent::Finished {
            strategy,
            feeds: feeds.to_vec(),
            pages_visited,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FeedKind;

    fn sample_feed() -> FeedRecord {
        FeedRecord {
            url: "https://example.com/feed".to_owned(),
            kind: FeedKind::Rss,
            title: None,
            discovered_by: Strategy::Blind,
        }
    }

    #[test]
    fn disabled_sink_swallows_events() {
        let sink = ProgressSink::disabled();
        sink.started(Strategy::Blind);
        sink.feed_found(Strategy::Blind, &sample_feed());
        sink.finished(Strategy::Blind, &[], None);
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);

        sink.started(Strategy::Blind);
        sink.progress(Strategy::Blind, 1, Some(10));
        sink.finished(Strategy::Blind, &[sample_feed()], None);

        assert!(matches!(rx.recv().await, Some(SearchEvent::Started { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(SearchEvent::Progress { checked: 1, .. })
        ));
        match rx.recv().await {
            Some(SearchEvent::Finished { feeds, .. }) => assert_eq!(feeds.len(), 1),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn dropped_receiver_does_not_fail_emission() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        let sink = ProgressSink::new(tx);
        sink.milestone(Strategy::Deep, "still fine");
    }
}
