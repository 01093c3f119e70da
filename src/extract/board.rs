use super::{structural, text_of, BoardPage, Extractor, RecordError, RecordFailure};
use crate::model::Thread;
use crate::url::{strip_view_all, ForumLink, THREAD_PAGE_SIZE};
use crate::HarvestError;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static SUBJECT_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.subject").unwrap());

static PAGE_CLUSTER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"small[id^="pages"] a"#).unwrap());

static SUBJECT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[id^="msg_"] a"#).unwrap());

impl Extractor {
    /// Extracts the thread listings on one board page
    ///
    /// Each listing's page count comes from its own pagination cluster: the
    /// link with the highest offset wins and `offset / 20 + 1` pages are
    /// assumed. Single-page threads have no cluster, so the subject link is
    /// used instead.
    ///
    /// # Errors
    ///
    /// Returns `StructuralMismatch` if the page has no `td.subject` cells.
    pub fn board_page(&self, html: &str, page_url: &str) -> Result<BoardPage, HarvestError> {
        let document = Html::parse_document(html);

        let cells: Vec<ElementRef<'_>> = document.select(&SUBJECT_CELL).collect();
        if cells.is_empty() {
            return Err(structural(page_url, "no td.subject cells"));
        }

        let mut threads = Vec::with_capacity(cells.len());
        let mut failures = Vec::new();

        for (index, cell) in cells.into_iter().enumerate() {
            match self.parse_listing(cell) {
                Ok(thread) => threads.push(thread),
                Err(e) => failures.push(RecordFailure {
                    index,
                    message: format!("thread {index} on {page_url}: {e}"),
                }),
            }
        }

        Ok(BoardPage {
            threads,
            failures,
            pagination: self.pagination(&document),
        })
    }

    fn parse_listing(&self, cell: ElementRef<'_>) -> Result<Thread, RecordError> {
        let subject = cell.select(&SUBJECT_LINK).next();
        let title = subject.map(text_of).filter(|t| !t.is_empty());

        let mut links: Vec<ElementRef<'_>> = cell.select(&PAGE_CLUSTER).collect();
        if links.is_empty() {
            links.extend(subject);
        }

        let mut best: Option<(String, u64, u32)> = None;
        let mut view_all = false;

        for anchor in links {
            let Some(href) = anchor.value().attr("href").and_then(|h| self.resolve(h)) else {
                continue;
            };
            let (link, all) = strip_view_all(&href);
            view_all |= all;

            if let Ok(ForumLink::Thread { host, id, offset }) = ForumLink::parse(link) {
                if best.as_ref().map_or(true, |(_, _, o)| offset > *o) {
                    best = Some((host, id, offset));
                }
            }
        }

        let (host, id, offset) = match best {
            Some(found) => found,
            None => return Err(RecordError::BadLink("thread listing")),
        };

        Ok(Thread::listed(
            &host,
            id,
            title,
            offset / THREAD_PAGE_SIZE + 1,
            view_all,
        ))
    }
}
