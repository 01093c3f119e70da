//! Scans over synthetic boards and threads

use crate::common::*;
use async_trait::async_trait;
use forum_harvest::crawler::{
    EventSink, Fetcher, NullSink, PageSource, PaginationWalker, RecordingSink, RetryPolicy,
    ScanEvent,
};
use forum_harvest::{Board, Extractor, HarvestError, Thread};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn page_numbers(sink: &RecordingSink) -> Vec<u32> {
    sink.pages()
        .into_iter()
        .filter_map(|event| match event {
            ScanEvent::PageProcessed { page, .. } => Some(page),
            _ => None,
        })
        .collect()
}

fn progress(sink: &RecordingSink) -> Vec<f64> {
    sink.pages()
        .into_iter()
        .filter_map(|event| match event {
            ScanEvent::PageProcessed { progress, .. } => Some(progress),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_cached_thread_pages_fetched_once() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 55, false);
    let walker = walker(source.clone(), Arc::new(NullSink));
    let cancel = CancellationToken::new();

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let first = walker.scan(&mut thread, 1, 2, &cancel).await.unwrap();
    let second = walker.scan(&mut thread, 2, 2, &cancel).await.unwrap();
    let third = walker.scan(&mut thread, 1, 3, &cancel).await.unwrap();

    assert_eq!(first.len(), 40);
    assert_eq!(second.len(), 35);
    assert_eq!(third.len(), 55);
    for page in 1..=3 {
        assert_eq!(source.calls(&thread_url(5, page)), 1, "page {page}");
    }
    assert_eq!(source.total_calls(), 3);
}

#[tokio::test]
async fn test_thread_scan_clamped_to_known_pages() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 55, false);
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let posts = walker
        .scan(&mut thread, 2, 10, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(thread.page_count(), Some(3));
    assert_eq!(posts.len(), 35);
    assert_eq!(page_numbers(&sink), vec![2, 3]);
    assert_eq!(progress(&sink), vec![0.5, 1.0]);
}

#[tokio::test]
async fn test_start_zero_treated_as_one() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 30, false);
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    walker
        .scan(&mut thread, 0, 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page_numbers(&sink), vec![1]);
}

#[tokio::test]
async fn test_start_past_last_page_scans_nothing() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 30, false);
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let posts = walker
        .scan(&mut thread, 7, 3, &CancellationToken::new())
        .await
        .unwrap();

    assert!(posts.is_empty());
    assert!(sink.pages().is_empty());
    // Only page one, to learn the page count
    assert_eq!(source.total_calls(), 1);
}

#[tokio::test]
async fn test_progress_is_monotonic() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 100, false);
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    walker
        .scan(&mut thread, 1, 5, &CancellationToken::new())
        .await
        .unwrap();

    let progress = progress(&sink);
    assert_eq!(progress.len(), 5);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last().copied(), Some(1.0));
    assert_eq!(page_numbers(&sink), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_two_page_board_union_collapses_duplicates() {
    let source = Arc::new(MapSource::new());
    source.page(
        board_url(3, 1),
        board_page(3, &[(10, "Seeds", 1), (11, "Tools", 3), (12, "Soil", 1)], 2),
    );
    source.page(
        board_url(3, 2),
        board_page(3, &[(12, "Soil", 1), (13, "Water", 2)], 2),
    );
    let walker = walker(source.clone(), Arc::new(NullSink));

    let mut board = Board::from_url(&board_url(3, 1)).unwrap();
    let threads = walker
        .scan(&mut board, 1, 2, &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<u64> = threads.values().map(|t| t.id()).collect();
    assert_eq!(ids, vec![10, 11, 12, 13]);

    let tools = &threads[&11];
    assert_eq!(tools.page_count(), Some(3));
    assert_eq!(tools.title(), Some("Tools"));
}

#[tokio::test]
async fn test_board_pages_not_cached() {
    let source = Arc::new(MapSource::new());
    source.page(board_url(3, 1), board_page(3, &[(10, "Seeds", 1)], 1));
    let walker = walker(source.clone(), Arc::new(NullSink));
    let cancel = CancellationToken::new();

    let mut board = Board::from_url(&board_url(3, 1)).unwrap();
    walker.scan(&mut board, 1, 1, &cancel).await.unwrap();
    walker.scan(&mut board, 1, 1, &cancel).await.unwrap();

    assert_eq!(source.calls(&board_url(3, 1)), 2);
}

#[tokio::test]
async fn test_board_page_count_resolution() {
    let source = Arc::new(MapSource::new());
    source.page(board_url(3, 1), board_page(3, &[(10, "Seeds", 1)], 4));
    let walker = walker(source.clone(), Arc::new(NullSink));

    let mut board = Board::from_url(&board_url(3, 1)).unwrap();
    let pages = walker
        .resolve_page_count(&mut board, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(pages, 4);
    assert_eq!(board.page_count(), Some(4));
}

/// Cancels the scan once a given page has been processed
struct CancelAfter {
    page: u32,
    token: CancellationToken,
}

impl EventSink for CancelAfter {
    fn emit(&self, event: ScanEvent) {
        if let ScanEvent::PageProcessed { page, .. } = event {
            if page == self.page {
                self.token.cancel();
            }
        }
    }
}

#[tokio::test]
async fn test_cancel_keeps_completed_pages_cached() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 80, false);
    let cancel = CancellationToken::new();
    let sink = Arc::new(CancelAfter {
        page: 2,
        token: cancel.clone(),
    });
    let walker = walker(source.clone(), sink);

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let result = walker.scan(&mut thread, 1, 4, &cancel).await;

    assert!(matches!(result, Err(HarvestError::Cancelled)));
    assert!(thread.is_cached(1));
    assert!(thread.is_cached(2));
    assert!(!thread.is_cached(3));
    assert_eq!(source.calls(&thread_url(5, 3)), 0);
    assert_eq!(thread.all_cached_posts().len(), 40);
}

/// Cancels the token when one URL is requested, then serves it as usual
struct CancelOnFetch {
    inner: Arc<MapSource>,
    url: String,
    token: CancellationToken,
}

#[async_trait]
impl PageSource for CancelOnFetch {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        if url == self.url {
            self.token.cancel();
        }
        self.inner.fetch(url).await
    }
}

#[tokio::test]
async fn test_cancel_during_fetch_discards_page() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 80, false);
    let cancel = CancellationToken::new();
    let sink = Arc::new(RecordingSink::new());
    let walker = PaginationWalker::new(
        Fetcher::new(
            Arc::new(CancelOnFetch {
                inner: source.clone(),
                url: thread_url(5, 2),
                token: cancel.clone(),
            }),
            Duration::ZERO,
        ),
        Extractor::new(HOST, ',').unwrap(),
        RetryPolicy::new(3, Duration::ZERO),
        sink.clone(),
    );

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let result = walker.scan(&mut thread, 1, 4, &cancel).await;

    assert!(matches!(result, Err(HarvestError::Cancelled)));
    assert!(thread.is_cached(1));
    assert!(!thread.is_cached(2));
    assert_eq!(source.calls(&thread_url(5, 2)), 1);
    assert_eq!(source.calls(&thread_url(5, 3)), 0);
    assert_eq!(page_numbers(&sink), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_cuts_request_delay_short() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 80, false);
    let delay = Duration::from_secs(30);
    let walker = PaginationWalker::new(
        Fetcher::new(source.clone(), delay),
        Extractor::new(HOST, ',').unwrap(),
        RetryPolicy::new(3, Duration::ZERO),
        Arc::new(NullSink),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let result = walker.scan(&mut thread, 1, 4, &cancel).await;

    assert!(matches!(result, Err(HarvestError::Cancelled)));
    assert!(started.elapsed() < delay);
    assert!(thread.is_cached(1));
    assert_eq!(source.total_calls(), 1);
}

#[tokio::test]
async fn test_long_thread_scan() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 7, 2000, false);
    let walker = walker(source.clone(), Arc::new(NullSink));

    let mut thread = Thread::from_url(&thread_url(7, 1)).unwrap();
    let posts = walker
        .scan(&mut thread, 1, u32::MAX, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(thread.page_count(), Some(100));
    assert_eq!(posts.len(), 2000);
    assert!(posts.keys().copied().eq(1..=2000));
    assert!(posts.values().all(|post| post.is_complete()));
    assert_eq!(source.total_calls(), 100);
}

#[tokio::test]
async fn test_first_page_listings_returned() {
    let source = Arc::new(MapSource::new());
    source.page(
        board_url(3, 1),
        board_page(3, &[(10, "Seeds", 1), (11, "Tools", 2)], 3),
    );
    let walker = walker(source.clone(), Arc::new(NullSink));

    let mut board = Board::from_url(&board_url(3, 1)).unwrap();
    let first = walker
        .resolve_first_page(&mut board, &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<u64> = first.items.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![10, 11]);
    assert_eq!(board.page_count(), Some(3));
    assert_eq!(source.total_calls(), 1);
}

#[tokio::test]
async fn test_structural_mismatch_not_retried() {
    let source = Arc::new(MapSource::new());
    source.page(thread_url(5, 1), "<html><body>Down for maintenance</body></html>");
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let result = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(HarvestError::StructuralMismatch { .. })));
    assert_eq!(source.calls(&thread_url(5, 1)), 1);
    assert_eq!(sink.failures().len(), 1);
}

#[tokio::test]
async fn test_transient_failures_then_success() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 10, false);
    source.fail(thread_url(5, 1), 2);
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let posts = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(posts.len(), 10);
    assert_eq!(source.calls(&thread_url(5, 1)), 3);

    let attempts: Vec<u32> = sink
        .attempts()
        .into_iter()
        .filter_map(|event| match event {
            ScanEvent::Attempt { attempt, .. } => Some(attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_connectivity_exhausted() {
    let source = Arc::new(MapSource::new());
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let result = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::ConnectivityExhausted { attempts: 3, .. })
    ));
    assert_eq!(source.calls(&thread_url(5, 1)), 3);
    assert_eq!(sink.attempts().len(), 3);
    assert_eq!(sink.failures().len(), 1);
}

#[tokio::test]
async fn test_broken_record_reported_and_dropped() {
    let source = Arc::new(MapSource::new());
    let html = thread_page(5, 1..=3, 1, false).replace(">#2<", ">second<");
    source.page(thread_url(5, 1), html);
    let sink = Arc::new(RecordingSink::new());
    let walker = walker(source.clone(), sink.clone());

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let posts = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await
        .unwrap();

    let positions: Vec<u32> = posts.keys().copied().collect();
    assert_eq!(positions, vec![1, 3]);
    assert_eq!(sink.failures().len(), 1);
}

#[tokio::test]
async fn test_fetch_all_fills_page_cache() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 45, true);
    let walker = walker(source.clone(), Arc::new(NullSink));
    let cancel = CancellationToken::new();

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    walker.resolve_page_count(&mut thread, &cancel).await.unwrap();
    assert!(thread.supports_view_all());
    assert_eq!(thread.page_count(), Some(3));

    let posts = walker.fetch_all(&mut thread, &cancel).await.unwrap();
    assert_eq!(posts.len(), 45);

    let scanned = walker.scan(&mut thread, 1, 3, &cancel).await.unwrap();
    assert_eq!(scanned.len(), 45);
    assert_eq!(source.calls(&thread_url(5, 2)), 0);
    assert_eq!(source.calls(&thread_url(5, 3)), 0);
    assert_eq!(source.calls(&view_all_url(5)), 1);
}

#[tokio::test]
async fn test_scanned_posts_are_complete() {
    let source = Arc::new(MapSource::new());
    serve_thread(&source, 5, 3, false);
    let walker = walker(source.clone(), Arc::new(NullSink));

    let mut thread = Thread::from_url(&thread_url(5, 1)).unwrap();
    let posts = walker
        .scan(&mut thread, 1, 1, &CancellationToken::new())
        .await
        .unwrap();

    let second = &posts[&2];
    assert!(second.is_complete());
    assert_eq!(second.link(), Some(post_url(5, 2).as_str()));
    assert_eq!(second.author_link(), Some(author_url(3).as_str()));
    assert_eq!(second.body(), Some("Body of post 2"));
}
