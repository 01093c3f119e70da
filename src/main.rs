//! Forum-Harvest main entry point
//!
//! This is the command-line interface for the Forum-Harvest scraper.

use anyhow::Context;
use clap::{Parser, Subcommand};
use forum_harvest::config::{load_config_with_hash, Config};
use forum_harvest::crawler::{Enricher, EventSink, PaginationWalker, RecordingSink};
use forum_harvest::{Board, HarvestError, Post, Thread};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Forum-Harvest: incremental forum scraper
///
/// Walks the boards and threads of an SMF-style forum page by page and
/// prints the extracted records as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "forum-harvest")]
#[command(version)]
#[command(about = "Incremental forum scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the threads on a board
    Board {
        /// Any page URL of the board
        url: String,

        /// First page to scan
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Number of pages (default: through the last page)
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Extract the posts of a thread
    Thread {
        /// Any page URL of the thread
        url: String,

        /// First page to scan
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Number of pages (default: through the last page)
        #[arg(long, conflicts_with = "all")]
        pages: Option<u32>,

        /// Use the single view-all page when the thread offers one
        #[arg(long)]
        all: bool,
    },

    /// Fetch one post by its direct link
    Post {
        /// Direct post link (`...?topic=N.msgM#msgM`)
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let sink = Arc::new(RecordingSink::new());
    let walker = build_walker(&config, sink.clone())?;

    let outcome = match cli.command {
        Command::Board { url, start, pages } => {
            handle_board(&walker, &url, start, pages, &cancel).await
        }
        Command::Thread {
            url,
            start,
            pages,
            all,
        } => handle_thread(&walker, &url, start, pages, all, &cancel).await,
        Command::Post { url } => handle_post(walker, &url, &cancel).await,
    };

    print_summary(&sink);

    match outcome {
        Err(e) if e.is_cancelled() => {
            tracing::warn!("Stopped early on interrupt");
            Ok(())
        }
        other => other.context("harvest failed"),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forum_harvest=info,warn"),
            1 => EnvFilter::new("forum_harvest=debug,info"),
            2 => EnvFilter::new("forum_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels the token on the first Ctrl-C
fn watch_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });
}

fn build_walker(config: &Config, sink: Arc<RecordingSink>) -> anyhow::Result<PaginationWalker> {
    let walker = PaginationWalker::from_config(config).context("failed to set up fetcher")?;
    let sink: Arc<dyn EventSink> = sink;
    Ok(walker.with_sink(sink))
}

async fn handle_board(
    walker: &PaginationWalker,
    url: &str,
    start: u32,
    pages: Option<u32>,
    cancel: &CancellationToken,
) -> Result<(), HarvestError> {
    let mut board = Board::from_url(url)?;
    let mut threads = BTreeMap::new();
    let start = start.max(1);

    let (start, pages) = match pages {
        Some(pages) => (start, pages),
        None => {
            let first = walker.resolve_first_page(&mut board, cancel).await?;
            let total = board.page_count().unwrap_or(1);
            if start == 1 {
                // Boards are not cached, so page one is kept from here
                threads.extend(first.items.into_iter().map(|t| (t.id(), t)));
                (2, total.saturating_sub(1))
            } else {
                (start, (total + 1).saturating_sub(start))
            }
        }
    };

    for (id, thread) in walker.scan(&mut board, start, pages, cancel).await? {
        threads.entry(id).or_insert(thread);
    }

    let threads: Vec<Thread> = threads.into_values().collect();
    emit_lines(&threads);
    Ok(())
}

async fn handle_thread(
    walker: &PaginationWalker,
    url: &str,
    start: u32,
    pages: Option<u32>,
    all: bool,
    cancel: &CancellationToken,
) -> Result<(), HarvestError> {
    let mut thread = Thread::from_url(url)?;

    let result = if all {
        walker.resolve_page_count(&mut thread, cancel).await?;
        if thread.supports_view_all() {
            walker.fetch_all(&mut thread, cancel).await.map(|_| ())
        } else {
            tracing::info!("Thread has no view-all page, scanning page by page");
            walker
                .scan(&mut thread, 1, u32::MAX, cancel)
                .await
                .map(|_| ())
        }
    } else {
        walker
            .scan(&mut thread, start, pages.unwrap_or(u32::MAX), cancel)
            .await
            .map(|_| ())
    };

    // Whatever made it into the cache is printed, even after an interrupt.
    // Page one may be cached just to learn the page count.
    let wanted = if all {
        1..u32::MAX
    } else {
        let start = start.max(1);
        start..start.saturating_add(pages.unwrap_or(u32::MAX))
    };
    let posts = thread.cached_posts_in(wanted);
    emit_lines(&posts);

    result
}

async fn handle_post(
    walker: PaginationWalker,
    url: &str,
    cancel: &CancellationToken,
) -> Result<(), HarvestError> {
    let mut post = Post::from_link(url)?;
    Enricher::new(walker).enrich(&mut post, cancel).await?;

    if !post.is_complete() {
        tracing::warn!("Post {} could not be completed", url);
    }
    emit_lines(std::slice::from_ref(&post));
    Ok(())
}

fn emit_lines<T: Serialize>(records: &[T]) {
    for record in records {
        match serde_json::to_string(record) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!("Failed to serialize record: {}", e),
        }
    }
}

fn print_summary(sink: &RecordingSink) {
    let attempts = sink.attempts().len();
    let pages = sink.pages().len();
    let failures = sink.failures();

    tracing::info!(
        "Processed {} page(s) in {} request attempt(s), {} failure(s)",
        pages,
        attempts,
        failures.len()
    );
    for failure in failures {
        tracing::debug!("{:?}", failure);
    }
}
