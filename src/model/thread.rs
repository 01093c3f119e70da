use crate::model::Post;
use crate::url::{page_url, parse_thread_base, thread_base, ForumLink, THREAD_PAGE_SIZE, VIEW_ALL_MARKER};
use crate::UrlError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::ops::Range;

/// Fixed-size slot array for one cached thread page
///
/// A post occupies slot `position mod THREAD_PAGE_SIZE`.
pub type PageSlots = Vec<Option<Post>>;

/// A thread: the paginated list of posts under one topic
///
/// Owns its page cache exclusively. Callers must not run two scans over the
/// same `Thread` at once; scans of different threads are independent.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    host: String,
    id: u64,
    base_link: String,
    title: Option<String>,
    page_count: Option<u32>,
    supports_view_all: bool,
    #[serde(skip)]
    pages: BTreeMap<u32, PageSlots>,
}

impl Thread {
    /// Builds a thread from any of its page URLs
    ///
    /// # Errors
    ///
    /// Fails if the URL does not match the thread link grammar.
    pub fn from_url(url: &str) -> Result<Self, UrlError> {
        match ForumLink::parse(url)? {
            ForumLink::Thread { host, id, .. } => Ok(Self::new(host, id)),
            other => Err(UrlError::UnexpectedKind {
                expected: "thread",
                found: other.kind(),
            }),
        }
    }

    /// Rebuilds a thread from the unfinished link a post carries
    pub fn from_base_link(base: &str) -> Result<Self, UrlError> {
        let (host, id) = parse_thread_base(base)?;
        Ok(Self::new(host, id))
    }

    pub fn new(host: impl Into<String>, id: u64) -> Self {
        let host = host.into();
        let base_link = thread_base(&host, id);
        Self {
            host,
            id,
            base_link,
            title: None,
            page_count: None,
            supports_view_all: false,
            pages: BTreeMap::new(),
        }
    }

    /// Thread as listed on a board page, page count already known
    pub(crate) fn listed(
        host: &str,
        id: u64,
        title: Option<String>,
        page_count: u32,
        supports_view_all: bool,
    ) -> Self {
        let mut thread = Self::new(host, id);
        thread.title = title;
        thread.page_count = Some(page_count.max(1));
        thread.supports_view_all = supports_view_all;
        thread
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Unfinished link: prefix and id, page offset left off
    pub fn base_link(&self) -> &str {
        &self.base_link
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// URL of a one-based page
    pub fn page_url(&self, page: u32) -> String {
        page_url(&self.base_link, page, THREAD_PAGE_SIZE)
    }

    /// URL of the single page listing every post
    pub fn view_all_link(&self) -> String {
        format!("{}0{}", self.base_link, VIEW_ALL_MARKER)
    }

    /// Known page count, or None until resolved
    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    pub fn is_resolved(&self) -> bool {
        self.page_count.is_some()
    }

    pub fn supports_view_all(&self) -> bool {
        self.supports_view_all
    }

    /// Records what page one revealed; a page count below 1 becomes 1
    pub(crate) fn resolve(&mut self, page_count: u32, supports_view_all: bool) {
        self.page_count = Some(page_count.max(1));
        self.supports_view_all |= supports_view_all;
    }

    pub fn is_cached(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    /// Cached page numbers in increasing order
    pub fn cached_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    /// Posts of a cached page, in slot order
    pub fn cached_posts(&self, page: u32) -> Option<Vec<Post>> {
        self.pages
            .get(&page)
            .map(|slots| slots.iter().flatten().cloned().collect())
    }

    /// Every cached post across all pages
    pub fn all_cached_posts(&self) -> Vec<Post> {
        self.pages
            .values()
            .flat_map(|slots| slots.iter().flatten().cloned())
            .collect()
    }

    /// Cached posts on the given pages, in position order
    pub fn cached_posts_in(&self, pages: Range<u32>) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .pages
            .range(pages)
            .flat_map(|(_, slots)| slots.iter().flatten().cloned())
            .collect();
        posts.sort_by_key(|post| post.position());
        posts
    }

    /// Stores the posts read from one page, marking the page as cached
    ///
    /// A page with no posts is still cached. Posts without a position have
    /// no slot and are skipped.
    pub(crate) fn cache_page(&mut self, page: u32, posts: &[Post]) {
        let slots = self
            .pages
            .entry(page)
            .or_insert_with(|| vec![None; THREAD_PAGE_SIZE as usize]);
        for post in posts {
            if let Some(position) = post.position() {
                slots[slot_index(position)] = Some(post.clone());
            }
        }
    }

    /// Stores posts from a view-all page, each under the page its position falls on
    pub(crate) fn cache_by_position(&mut self, posts: &[Post]) {
        let mut buckets: BTreeMap<u32, Vec<Post>> = BTreeMap::new();
        for post in posts {
            if let Some(position) = post.position() {
                buckets
                    .entry(page_of_position(position))
                    .or_default()
                    .push(post.clone());
            }
        }
        for (page, posts) in buckets {
            self.cache_page(page, &posts);
        }
    }
}

/// One-based page a one-based post position falls on
///
/// Positions 1..=20 land on page 1, 21..=40 on page 2, and so on.
pub fn page_of_position(position: u32) -> u32 {
    position.saturating_sub(1) / THREAD_PAGE_SIZE + 1
}

/// Slot a post occupies inside its page's slot array
pub fn slot_index(position: u32) -> usize {
    (position % THREAD_PAGE_SIZE) as usize
}

impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        self.base_link == other.base_link
    }
}

impl Eq for Thread {}

impl Hash for Thread {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base_link.hash(state);
    }
}
