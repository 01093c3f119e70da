use crate::url::{board_base, page_url, ForumLink, BOARD_PAGE_SIZE};
use crate::UrlError;
use serde::Serialize;

/// A board: the paginated list of threads in one forum section
///
/// The base link is fixed at construction. The page count starts unresolved
/// and is filled in by [`crate::PaginationWalker::resolve_page_count`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    host: String,
    id: u64,
    base_link: String,
    page_count: Option<u32>,
}

impl Board {
    /// Builds a board from any of its page URLs
    ///
    /// # Errors
    ///
    /// Fails if the URL does not match the board link grammar.
    pub fn from_url(url: &str) -> Result<Self, UrlError> {
        match ForumLink::parse(url)? {
            ForumLink::Board { host, id, .. } => Ok(Self::new(host, id)),
            other => Err(UrlError::UnexpectedKind {
                expected: "board",
                found: other.kind(),
            }),
        }
    }

    pub fn new(host: impl Into<String>, id: u64) -> Self {
        let host = host.into();
        let base_link = board_base(&host, id);
        Self {
            host,
            id,
            base_link,
            page_count: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_link(&self) -> &str {
        &self.base_link
    }

    /// URL of a one-based page
    pub fn page_url(&self, page: u32) -> String {
        page_url(&self.base_link, page, BOARD_PAGE_SIZE)
    }

    /// Known page count, or None until resolved
    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    pub fn is_resolved(&self) -> bool {
        self.page_count.is_some()
    }

    /// Records the resolved page count; anything below 1 becomes 1
    pub(crate) fn set_page_count(&mut self, pages: u32) {
        self.page_count = Some(pages.max(1));
    }
}
