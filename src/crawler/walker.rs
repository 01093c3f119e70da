//! Page-by-page traversal of boards and threads
//!
//! # Scan Loop
//!
//! For each page in the requested range, strictly in increasing order:
//! 1. Reuse the cached records if the container has the page
//! 2. Otherwise fetch through the retry policy and extract; if the scan was
//!    cancelled meanwhile, stop without storing the page
//! 3. Store the page and union its records into the result, keyed by
//!    [`Paginated::key`]
//! 4. Pause for the inter-request delay (fetched pages only); cancellation
//!    cuts the pause short
//! 5. Emit `PageProcessed`, then check for cancellation
//!
//! A cancelled scan returns `Cancelled`; pages finished before that stay
//! cached on the container.

use super::container::{Paginated, ParsedPage, Scanned};
use super::events::{EventSink, NullSink, ScanEvent};
use super::fetcher::Fetcher;
use super::retry::RetryPolicy;
use crate::config::Config;
use crate::extract::{Extractor, RecordFailure, ThreadPage};
use crate::model::{Post, Thread};
use crate::HarvestError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives fetch, retry and extraction over a container's pages
#[derive(Clone)]
pub struct PaginationWalker {
    fetcher: Fetcher,
    extractor: Arc<Extractor>,
    retry: RetryPolicy,
    sink: Arc<dyn EventSink>,
}

impl PaginationWalker {
    pub fn new(
        fetcher: Fetcher,
        extractor: Extractor,
        retry: RetryPolicy,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(extractor),
            retry,
            sink,
        }
    }

    /// HTTP-backed walker for the configured forum; events are discarded
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::from_config(&config.fetch)?;
        let extractor = Extractor::new(&config.forum.host, config.extract.smiley_char())?;
        let retry = RetryPolicy::from_config(&config.fetch);
        Ok(Self::new(fetcher, extractor, retry, Arc::new(NullSink)))
    }

    /// Same walker, reporting to a different sink
    pub fn with_sink(&self, sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            ..self.clone()
        }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Scans `count` pages of a container starting at the one-based `start`
    ///
    /// # Arguments
    ///
    /// * `container` - Board or thread; thread pages are cached on it
    /// * `start` - First page, 0 is treated as 1
    /// * `count` - Pages requested; for threads, cut to the known page count
    ///   (resolved first if unknown)
    /// * `cancel` - Checked after every fetch and every page
    ///
    /// # Returns
    ///
    /// * `Ok(Scanned)` - Union of the records of every scanned page; a record
    ///   seen on two pages keeps its first occurrence
    /// * `Err(HarvestError::Cancelled)` - Cancelled; the in-flight page is
    ///   discarded
    /// * `Err(_)` - A page failed past its retry budget or did not match
    ///   the expected markup
    pub async fn scan<C: Paginated>(
        &self,
        container: &mut C,
        start: u32,
        count: u32,
        cancel: &CancellationToken,
    ) -> Result<Scanned<C>, HarvestError> {
        let start = start.max(1);
        let count = if C::CLAMP_TO_KNOWN_PAGES {
            let known = match container.page_count() {
                Some(known) => known,
                None => self.resolve_page_count(container, cancel).await?,
            };
            count.min((known + 1).saturating_sub(start))
        } else {
            count
        };

        tracing::info!(
            "Scanning {} page(s) from page {} of {}",
            count,
            start,
            container.page_url(start)
        );

        let mut result: Scanned<C> = BTreeMap::new();
        let end = start.saturating_add(count);

        for (done, page) in (start..end).enumerate() {
            let items = match container.cached(page) {
                Some(items) => {
                    tracing::debug!("Page {} served from cache", page);
                    items
                }
                None => {
                    let parsed = self.fetch_page(container, page, cancel).await?;
                    if cancel.is_cancelled() {
                        tracing::info!("Scan cancelled while fetching page {}", page);
                        return Err(HarvestError::Cancelled);
                    }
                    container.store(page, &parsed.items);
                    self.pause(cancel).await;
                    parsed.items
                }
            };

            let records = items.len();
            for item in items {
                result.entry(C::key(&item)).or_insert(item);
            }

            self.sink.emit(ScanEvent::PageProcessed {
                page,
                progress: (done + 1) as f64 / count as f64,
                records,
            });

            if cancel.is_cancelled() {
                tracing::info!("Scan cancelled after page {}", page);
                return Err(HarvestError::Cancelled);
            }
        }

        tracing::info!("Scan finished with {} unique record(s)", result.len());
        Ok(result)
    }

    /// Fetches page one and records the container's page count
    ///
    /// For threads this also learns whether a view-all page exists, and the
    /// page's posts are cached so a following scan does not fetch it again.
    pub async fn resolve_page_count<C: Paginated>(
        &self,
        container: &mut C,
        cancel: &CancellationToken,
    ) -> Result<u32, HarvestError> {
        let first = self.resolve_first_page(container, cancel).await?;
        let pages = first.pagination.page_count(C::PAGE_SIZE);
        Ok(container.page_count().unwrap_or(pages))
    }

    /// Like [`resolve_page_count`](Self::resolve_page_count), but hands back
    /// page one's records
    ///
    /// Useful for boards, which do not cache the page.
    pub async fn resolve_first_page<C: Paginated>(
        &self,
        container: &mut C,
        cancel: &CancellationToken,
    ) -> Result<ParsedPage<C::Item>, HarvestError> {
        let parsed = self.fetch_page(container, 1, cancel).await?;
        if cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }
        let pages = parsed.pagination.page_count(C::PAGE_SIZE);

        container.resolve(pages, parsed.pagination.view_all);
        container.store(1, &parsed.items);
        self.pause(cancel).await;

        tracing::debug!("Resolved {} page(s) for {}", pages, container.page_url(1));
        Ok(parsed)
    }

    /// Fetches and extracts one page through the retry policy
    ///
    /// Per-record failures are reported to the sink; the page itself
    /// succeeds with the records that could be read.
    pub async fn fetch_page<C: Paginated>(
        &self,
        container: &C,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<ParsedPage<C::Item>, HarvestError> {
        let url = container.page_url(page);
        let fetcher = &self.fetcher;
        let extractor = self.extractor.as_ref();
        let target = url.as_str();

        let parsed = self
            .retry
            .run(target, self.sink.as_ref(), cancel, || async move {
                let html = fetcher.fetch(target).await?;
                container.parse_page(extractor, &html, target)
            })
            .await
            .map_err(|e| self.page_failed(e))?;

        self.report_records(&parsed.failures);
        Ok(parsed)
    }

    /// Fetches any URL that renders as a thread page, such as a post link
    ///
    /// Nothing is cached; the caller decides what to keep.
    pub async fn fetch_thread_url(
        &self,
        url: &str,
        thread_link: &str,
        cancel: &CancellationToken,
    ) -> Result<ThreadPage, HarvestError> {
        let fetcher = &self.fetcher;
        let extractor = self.extractor.as_ref();

        let page = self
            .retry
            .run(url, self.sink.as_ref(), cancel, || async move {
                let html = fetcher.fetch(url).await?;
                extractor.thread_page(&html, thread_link, url)
            })
            .await
            .map_err(|e| self.page_failed(e))?;

        self.report_records(&page.failures);
        Ok(page)
    }

    /// Fetches the thread's view-all page and caches every post by position
    ///
    /// Does not check [`Thread::supports_view_all`]; callers decide whether
    /// the bulk page is worth trying.
    pub async fn fetch_all(
        &self,
        thread: &mut Thread,
        cancel: &CancellationToken,
    ) -> Result<Vec<Post>, HarvestError> {
        let url = thread.view_all_link();
        let page = self
            .fetch_thread_url(&url, thread.base_link(), cancel)
            .await?;
        if cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }

        thread.cache_by_position(&page.posts);
        self.pause(cancel).await;

        tracing::info!("Bulk fetch of {} returned {} post(s)", url, page.posts.len());
        Ok(page.posts)
    }

    /// Inter-request delay, ended early by cancellation
    async fn pause(&self, cancel: &CancellationToken) {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            _ = self.fetcher.pause() => {}
        }
    }

    fn page_failed(&self, e: HarvestError) -> HarvestError {
        if !e.is_cancelled() {
            tracing::warn!("Page failed: {}", e);
            self.sink.emit(ScanEvent::ScanFailure {
                message: e.to_string(),
            });
        }
        e
    }

    fn report_records(&self, failures: &[RecordFailure]) {
        for failure in failures {
            tracing::warn!("Dropped record: {}", failure.message);
            self.sink.emit(ScanEvent::ScanFailure {
                message: failure.message.clone(),
            });
        }
    }
}

impl std::fmt::Debug for PaginationWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationWalker")
            .field("fetcher", &self.fetcher)
            .field("extractor", &self.extractor)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
