use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;

use feedhunt::search::events::{PageStatus, SearchEvent};
use feedhunt::util::truncate_url;
use feedhunt::{Config, SearchMode, SearchOptions, SearchSession, Strategy};

/// Width budget for URLs on progress lines.
const URL_DISPLAY_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(
    name = "feedhunt",
    version,
    about = "Find RSS, Atom, and JSON feeds on any website"
)]
struct Args {
    /// The website URL to search for feeds (scheme defaults to https)
    site: String,

    /// Meta search only
    #[arg(short = 'm', long)]
    metasearch: bool,

    /// Blind search only
    #[arg(short = 'b', long)]
    blindsearch: bool,

    /// Anchors search only
    #[arg(short = 'a', long)]
    anchors_only: bool,

    /// Enable deep search (site crawl)
    #[arg(short = 'd', long)]
    deepsearch: bool,

    /// Depth of deep search
    #[arg(long)]
    depth: Option<u32>,

    /// Maximum number of pages to visit during deep search
    #[arg(long)]
    max_links: Option<usize>,

    /// Timeout for fetch requests in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Keep query parameters from the original URL when searching
    #[arg(long)]
    keep_query_params: bool,

    /// Check if foreign domain URLs are feeds (but don't crawl them)
    #[arg(long)]
    check_foreign_feeds: bool,

    /// Stop deep search after a certain number of errors
    #[arg(long)]
    max_errors: Option<usize>,

    /// Stop search after finding a certain number of feeds
    #[arg(long)]
    max_feeds: Option<usize>,

    /// Deep search worker count
    #[arg(long)]
    concurrency: Option<usize>,

    /// Run every enabled strategy and accumulate results instead of stopping
    /// at the first one that finds feeds
    #[arg(long)]
    all: bool,

    /// Show non-fatal per-candidate fetch errors
    #[arg(long, hide = true)]
    show_errors: bool,

    /// Config file path (default: ~/.config/feedhunt/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Default config file location (~/.config/feedhunt/config.toml).
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("feedhunt")
            .join("config.toml"),
    )
}

fn build_options(args: &Args, config: &Config) -> SearchOptions {
    let mut options = config.search_options();
    if let Some(depth) = args.depth {
        options.depth = depth;
    }
    if let Some(max_links) = args.max_links {
        options.max_links = max_links;
    }
    if let Some(secs) = args.timeout {
        options.timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(max_errors) = args.max_errors {
        options.max_errors = max_errors;
    }
    if let Some(max_feeds) = args.max_feeds {
        options.max_feeds = max_feeds;
    }
    if let Some(concurrency) = args.concurrency {
        options.concurrency = concurrency;
    }
    options.keep_query_params |= args.keep_query_params;
    options.check_foreign_feeds |= args.check_foreign_feeds;
    options.stop_at_first = !args.all;
    options.show_errors = args.show_errors;
    options
}

/// First exclusive flag wins, matching the option precedence of the help text.
fn pick_mode(args: &Args) -> SearchMode {
    if args.metasearch {
        SearchMode::Exclusive(Strategy::MetaLinks)
    } else if args.blindsearch {
        SearchMode::Exclusive(Strategy::Blind)
    } else if args.anchors_only {
        SearchMode::Exclusive(Strategy::Anchors)
    } else {
        SearchMode::Standard {
            deep: args.deepsearch,
        }
    }
}

/// Renders the event stream as terminal progress output.
struct Renderer {
    /// A `\r`-rewritten progress line is on screen and needs a newline before
    /// any other output.
    progress_active: bool,
}

impl Renderer {
    fn new() -> Self {
        Self {
            progress_active: false,
        }
    }

    fn break_progress_line(&mut self) {
        if self.progress_active {
            println!();
            self.progress_active = false;
        }
    }

    fn handle(&mut self, event: SearchEvent) {
        match event {
            SearchEvent::Started { strategy } => {
                self.break_progress_line();
                println!("Start {}", strategy.nice_name());
            }
            SearchEvent::Progress {
                strategy,
                checked,
                total: Some(total),
            } => {
                print!("\r{} ({checked}/{total})        ", strategy.nice_name());
                let _ = std::io::stdout().flush();
                self.progress_active = true;
            }
            SearchEvent::Progress { .. } => {}
            SearchEvent::PageVisited { url, depth, status } => {
                self.break_progress_line();
                let url = truncate_url(&url, URL_DISPLAY_WIDTH);
                match status {
                    PageStatus::Feed => println!("[{depth}] {url} [feed]"),
                    PageStatus::NotFeed => println!("[{depth}] {url}"),
                    PageStatus::Failed(message) => println!("[{depth}] {url} failed: {message}"),
                }
            }
            SearchEvent::FeedFound { strategy, feed } => {
                // The crawler already prints its hits as visited pages.
                if strategy != Strategy::Deep {
                    self.break_progress_line();
                    println!("Found {} feed: {}", feed.kind, feed.url);
                }
            }
            SearchEvent::Milestone { message, .. } => {
                self.break_progress_line();
                println!("{message}");
            }
            SearchEvent::Failure { strategy, message } => {
                self.break_progress_line();
                match strategy {
                    Some(strategy) => eprintln!("Error in {strategy}: {message}"),
                    None => eprintln!("Error: {message}"),
                }
            }
            SearchEvent::Finished {
                strategy,
                feeds,
                pages_visited,
            } => {
                self.break_progress_line();
                let count = feeds.len();
                let word = if count == 1 { "feed" } else { "feeds" };
                match pages_visited {
                    Some(pages) => println!(
                        "Finished {}: {count} {word} found, visited {pages} pages",
                        strategy.nice_name()
                    ),
                    None => println!("Finished {}: {count} {word} found", strategy.nice_name()),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match args.config.clone().or_else(default_config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let options = build_options(&args, &config);
    let mode = pick_mode(&args);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(async move {
        let mut renderer = Renderer::new();
        while let Some(event) = event_rx.recv().await {
            renderer.handle(event);
        }
        renderer.break_progress_line();
    });

    let session = SearchSession::new(&args.site, options, Some(event_tx))
        .context("Could not start the search")?;
    let report = session.run(mode).await;

    // Close the event stream so the renderer drains and exits.
    drop(session);
    renderer.await.context("Progress renderer failed")?;

    if let Some(reason) = report.stopped {
        println!("Search stopped early: {reason}");
    }

    if report.feeds.is_empty() {
        println!("No feeds found");
        if !args.deepsearch && matches!(mode, SearchMode::Standard { .. }) {
            println!();
            println!("Note: Deep search is disabled by default.");
            println!("Try using the -d or --deepsearch flag to enable it:");
            println!("  feedhunt -d {}", args.site);
        }
        return Ok(());
    }

    let json =
        serde_json::to_string_pretty(&report.feeds).context("Failed to serialize results")?;
    println!("{json}");

    Ok(())
}
