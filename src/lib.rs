//! Find RSS, Atom, and JSON feeds on any website.
//!
//! Several independent strategies hunt for feeds: `<link>` declarations,
//! anchor probing, a catalog of common endpoints, and a bounded site crawl,
//! all coordinated by a [`SearchSession`] under one budget policy. Progress is
//! reported through an event stream so any front end (or none) can listen in.
//!
//! # Example
//!
//! ```no_run
//! use feedhunt::{SearchMode, SearchOptions, SearchSession};
//!
//! # async fn example() -> Result<(), feedhunt::SearchError> {
//! let session = SearchSession::new("example.com", SearchOptions::default(), None)?;
//! let report = session.run(SearchMode::Standard { deep: false }).await;
//! for feed in &report.feeds {
//!     println!("{} ({})", feed.url, feed.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod fetch;
pub mod html;
pub mod search;
pub mod util;

pub use classify::{classify, clean_title, FeedInfo, FeedKind};
pub use config::Config;
pub use search::events::{PageStatus, ProgressSink, SearchEvent};
pub use search::{
    FeedRecord, SearchError, SearchMode, SearchOptions, SearchReport, SearchSession, StopReason,
    Strategy,
};
