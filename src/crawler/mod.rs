//! Crawler module for page fetching and traversal
//!
//! This module contains the fetch-side logic, including:
//! - Rate-limited fetching over a pluggable page source
//! - Bounded retry with linear backoff
//! - Page-by-page scans of boards and threads with per-thread caching
//! - Lazy enrichment of partially known posts
//! - Scan notifications

mod container;
mod enrich;
mod events;
mod fetcher;
mod retry;
mod walker;

pub use container::{Paginated, ParsedPage, Scanned};
pub use enrich::{position_offset, Enricher, EnrichmentPlan};
pub use events::{EventSink, NullSink, RecordingSink, ScanEvent};
pub use fetcher::{build_http_client, Fetcher, HttpSource, PageSource};
pub use retry::RetryPolicy;
pub use walker::PaginationWalker;
