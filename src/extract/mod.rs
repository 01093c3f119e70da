//! Content extraction: rendered forum pages to records
//!
//! This module turns one page of HTML into records:
//! - Thread pages into [`Post`]s (see `thread`)
//! - Board pages into [`Thread`] listings (see `board`)
//! - Both into the page's own pagination summary
//!
//! Per-record problems never abort a page; they are reported back as
//! [`RecordFailure`]s. A page whose record containers are missing altogether
//! is a structural mismatch and fails as a whole.

mod board;
pub mod clean;
mod date;
mod thread;

pub use date::{parse_reference_date, resolve_timestamp, to_24_hour, DateError};

use crate::model::{Post, Thread};
use crate::url::{host_base, normalize_host, resolve_href, strip_view_all, ForumLink};
use crate::{HarvestError, UrlError};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

static PAGE_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.pagelinks a.navPages").unwrap());

/// Turns forum pages into records
#[derive(Debug, Clone)]
pub struct Extractor {
    host: String,
    base: Url,
    smiley_substitute: char,
}

/// Pagination summary read from a page's own page links
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Highest page offset linked from the page
    pub last_offset: Option<u32>,

    /// Whether a view-all link was offered
    pub view_all: bool,
}

impl Pagination {
    /// Page count implied by the highest offset; 1 when nothing was linked
    pub fn page_count(&self, step: u32) -> u32 {
        self.last_offset.map_or(1, |offset| offset / step + 1)
    }
}

/// A record that could not be extracted and was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Zero-based index of the record container on the page
    pub index: usize,
    pub message: String,
}

/// Posts extracted from one thread page
#[derive(Debug, Clone)]
pub struct ThreadPage {
    pub posts: Vec<Post>,
    pub failures: Vec<RecordFailure>,
    pub pagination: Pagination,
}

/// Thread listings extracted from one board page
#[derive(Debug, Clone)]
pub struct BoardPage {
    pub threads: Vec<Thread>,
    pub failures: Vec<RecordFailure>,
    pub pagination: Pagination,
}

/// Why a single record could not be extracted
#[derive(Debug, Error)]
pub(crate) enum RecordError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unusable link in {0}")]
    BadLink(&'static str),

    #[error("bad message number {0:?}")]
    BadPosition(String),

    #[error(transparent)]
    Date(#[from] DateError),
}

impl Extractor {
    /// Creates an extractor for the given forum host
    ///
    /// # Arguments
    ///
    /// * `host` - Forum host, normalized with [`normalize_host`]
    /// * `smiley_substitute` - Character every smiley image is replaced with
    pub fn new(host: &str, smiley_substitute: char) -> Result<Self, UrlError> {
        let host = normalize_host(host)?;
        let base = host_base(&host)?;
        Ok(Self {
            host,
            base,
            smiley_substitute,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn smiley_substitute(&self) -> char {
        self.smiley_substitute
    }

    fn resolve(&self, href: &str) -> Option<String> {
        resolve_href(&self.base, href)
    }

    /// Reads `div.pagelinks` into a pagination summary
    fn pagination(&self, document: &Html) -> Pagination {
        let mut pagination = Pagination::default();

        for anchor in document.select(&PAGE_LINKS) {
            let Some(href) = anchor.value().attr("href").and_then(|h| self.resolve(h)) else {
                continue;
            };
            let (link, view_all) = strip_view_all(&href);
            pagination.view_all |= view_all;

            if let Some(offset) = ForumLink::parse(link).ok().and_then(|l| l.offset()) {
                pagination.last_offset = Some(pagination.last_offset.map_or(offset, |o| o.max(offset)));
            }
        }

        pagination
    }
}

fn structural(url: &str, message: impl Into<String>) -> HarvestError {
    HarvestError::StructuralMismatch {
        url: url.to_string(),
        message: message.into(),
    }
}

fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
