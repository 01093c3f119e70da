//! What the walker needs to know about a paginated container
//!
//! Boards and threads are walked by the same loop. They differ in page size,
//! in what a page yields, and in whether pages are cached: thread pages are,
//! board pages are not, since boards reorder as threads are bumped.

use crate::extract::{Extractor, Pagination, RecordFailure};
use crate::model::{Board, Post, Thread};
use crate::url::{BOARD_PAGE_SIZE, THREAD_PAGE_SIZE};
use crate::HarvestError;
use std::collections::BTreeMap;

/// Records read from one page, whatever the container kind
#[derive(Debug, Clone)]
pub struct ParsedPage<T> {
    pub items: Vec<T>,
    pub failures: Vec<RecordFailure>,
    pub pagination: Pagination,
}

/// Deduplicated records of a scan, keyed by [`Paginated::key`]
pub type Scanned<C> = BTreeMap<<C as Paginated>::Key, <C as Paginated>::Item>;

/// A board or thread as seen by [`PaginationWalker`](super::PaginationWalker)
pub trait Paginated {
    /// What one page yields
    type Item: Clone;

    /// Identifies a record among everything one container yields
    type Key: Ord + Copy;

    /// Records per page, also the URL offset step
    const PAGE_SIZE: u32;

    /// Whether scans are limited to the known page count
    const CLAMP_TO_KNOWN_PAGES: bool;

    fn page_url(&self, page: u32) -> String;

    fn page_count(&self) -> Option<u32>;

    fn key(item: &Self::Item) -> Self::Key;

    /// Records what page one revealed about the container
    fn resolve(&mut self, page_count: u32, view_all: bool);

    fn parse_page(
        &self,
        extractor: &Extractor,
        html: &str,
        url: &str,
    ) -> Result<ParsedPage<Self::Item>, HarvestError>;

    /// Previously stored records of a page, if the container caches pages
    fn cached(&self, page: u32) -> Option<Vec<Self::Item>>;

    fn store(&mut self, page: u32, items: &[Self::Item]);
}

impl Paginated for Thread {
    type Item = Post;
    // Extracted posts always carry a position; 0 is never a valid one
    type Key = u32;

    const PAGE_SIZE: u32 = THREAD_PAGE_SIZE;
    const CLAMP_TO_KNOWN_PAGES: bool = true;

    fn page_url(&self, page: u32) -> String {
        Thread::page_url(self, page)
    }

    fn page_count(&self) -> Option<u32> {
        Thread::page_count(self)
    }

    fn key(post: &Post) -> u32 {
        post.position().unwrap_or(0)
    }

    fn resolve(&mut self, page_count: u32, view_all: bool) {
        Thread::resolve(self, page_count, view_all);
    }

    fn parse_page(
        &self,
        extractor: &Extractor,
        html: &str,
        url: &str,
    ) -> Result<ParsedPage<Post>, HarvestError> {
        let page = extractor.thread_page(html, self.base_link(), url)?;
        Ok(ParsedPage {
            items: page.posts,
            failures: page.failures,
            pagination: page.pagination,
        })
    }

    fn cached(&self, page: u32) -> Option<Vec<Post>> {
        self.cached_posts(page)
    }

    fn store(&mut self, page: u32, items: &[Post]) {
        self.cache_page(page, items);
    }
}

impl Paginated for Board {
    type Item = Thread;
    type Key = u64;

    const PAGE_SIZE: u32 = BOARD_PAGE_SIZE;
    const CLAMP_TO_KNOWN_PAGES: bool = false;

    fn page_url(&self, page: u32) -> String {
        Board::page_url(self, page)
    }

    fn page_count(&self) -> Option<u32> {
        Board::page_count(self)
    }

    fn key(thread: &Thread) -> u64 {
        thread.id()
    }

    fn resolve(&mut self, page_count: u32, _view_all: bool) {
        self.set_page_count(page_count);
    }

    fn parse_page(
        &self,
        extractor: &Extractor,
        html: &str,
        url: &str,
    ) -> Result<ParsedPage<Thread>, HarvestError> {
        let page = extractor.board_page(html, url)?;
        Ok(ParsedPage {
            items: page.threads,
            failures: page.failures,
            pagination: page.pagination,
        })
    }

    fn cached(&self, _page: u32) -> Option<Vec<Thread>> {
        None
    }

    fn store(&mut self, _page: u32, _items: &[Thread]) {}
}
