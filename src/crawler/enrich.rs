//! Lazy completion of partially known posts
//!
//! # Strategies
//!
//! | Known fields | Plan | Fetches | Not found |
//! |--------------|------|---------|-----------|
//! | direct link | `ByLink` | the linked page | post stays partial |
//! | thread + position | `ByPosition` | the one page holding the position | `EnrichmentImpossible` |
//! | thread + author + time | `ByAuthorTime` | the whole thread, bulk page first | `EnrichmentImpossible` |
//! | anything else | `Unresolvable` | nothing | no-op |
//!
//! A post that already has a body is never touched again.

use super::walker::PaginationWalker;
use crate::model::{Post, Thread};
use crate::url::THREAD_PAGE_SIZE;
use crate::HarvestError;
use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

/// How a partial post will be completed, chosen from its known fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentPlan {
    ByLink {
        link: String,
        thread_link: String,
    },
    ByPosition {
        thread_link: String,
        position: u32,
    },
    ByAuthorTime {
        thread_link: String,
        author_link: String,
        created: NaiveDateTime,
    },
    Unresolvable,
}

impl EnrichmentPlan {
    /// Picks the first strategy whose fields are all present
    pub fn select(post: &Post) -> Self {
        let thread_link = post.thread_link().map(str::to_string);

        match (post.link(), thread_link) {
            (Some(link), Some(thread_link)) => Self::ByLink {
                link: link.to_string(),
                thread_link,
            },
            (_, Some(thread_link)) => match (post.position(), post.author_link(), post.created()) {
                (Some(position), _, _) => Self::ByPosition {
                    thread_link,
                    position,
                },
                (None, Some(author_link), Some(created)) => Self::ByAuthorTime {
                    thread_link,
                    author_link: author_link.to_string(),
                    created,
                },
                _ => Self::Unresolvable,
            },
            (_, None) => Self::Unresolvable,
        }
    }
}

/// Offset of the thread page holding a one-based position
///
/// ```
/// use forum_harvest::crawler::position_offset;
///
/// assert_eq!(position_offset(1), 0);
/// assert_eq!(position_offset(20), 0);
/// assert_eq!(position_offset(41), 40);
/// ```
pub fn position_offset(position: u32) -> u32 {
    if position % THREAD_PAGE_SIZE == 0 {
        position.saturating_sub(THREAD_PAGE_SIZE)
    } else {
        position / THREAD_PAGE_SIZE * THREAD_PAGE_SIZE
    }
}

/// Completes partial posts by re-fetching what they point at
#[derive(Debug, Clone)]
pub struct Enricher {
    walker: PaginationWalker,
}

impl Enricher {
    pub fn new(walker: PaginationWalker) -> Self {
        Self { walker }
    }

    /// Fills in `post` from freshly fetched data
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Enriched, already enriched, or nothing to go on. A
    ///   by-link lookup that misses also lands here; check
    ///   [`Post::is_complete`] afterwards.
    /// * `Err(HarvestError::EnrichmentImpossible)` - The position or
    ///   author/time lookup found no matching post
    /// * `Err(_)` - Fetching failed past the retry budget, or cancelled
    pub async fn enrich(
        &self,
        post: &mut Post,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        if post.has_body() {
            return Ok(());
        }

        match EnrichmentPlan::select(post) {
            EnrichmentPlan::ByLink { link, thread_link } => {
                self.by_link(post, &link, &thread_link, cancel).await
            }
            EnrichmentPlan::ByPosition {
                thread_link,
                position,
            } => self.by_position(post, &thread_link, position, cancel).await,
            EnrichmentPlan::ByAuthorTime {
                thread_link,
                author_link,
                created,
            } => {
                self.by_author_time(post, &thread_link, &author_link, created, cancel)
                    .await
            }
            EnrichmentPlan::Unresolvable => {
                tracing::debug!("Post has no identifying fields to enrich from");
                Ok(())
            }
        }
    }

    async fn by_link(
        &self,
        post: &mut Post,
        link: &str,
        thread_link: &str,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        let page = self.walker.fetch_thread_url(link, thread_link, cancel).await?;

        match page.posts.iter().find(|candidate| **candidate == *post) {
            Some(found) => post.absorb(found),
            None => tracing::warn!("Post {} not present on its own page", link),
        }
        Ok(())
    }

    async fn by_position(
        &self,
        post: &mut Post,
        thread_link: &str,
        position: u32,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        let thread = Thread::from_base_link(thread_link)?;
        let page = position_offset(position) / THREAD_PAGE_SIZE + 1;

        let parsed = self.walker.fetch_page(&thread, page, cancel).await?;
        let found = parsed
            .items
            .iter()
            .find(|candidate| candidate.position() == Some(position))
            .ok_or_else(|| {
                HarvestError::EnrichmentImpossible(format!(
                    "no post at position {} on {}",
                    position,
                    thread.page_url(page)
                ))
            })?;

        post.absorb(found);
        Ok(())
    }

    async fn by_author_time(
        &self,
        post: &mut Post,
        thread_link: &str,
        author_link: &str,
        created: NaiveDateTime,
        cancel: &CancellationToken,
    ) -> Result<(), HarvestError> {
        let mut thread = Thread::from_base_link(thread_link)?;
        let pages = self.walker.resolve_page_count(&mut thread, cancel).await?;

        let posts: Vec<Post> = if thread.supports_view_all() {
            match self.walker.fetch_all(&mut thread, cancel).await {
                Ok(posts) => posts,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!("Bulk fetch failed, scanning pages instead: {}", e);
                    self.walker
                        .scan(&mut thread, 1, pages, cancel)
                        .await?
                        .into_values()
                        .collect()
                }
            }
        } else {
            self.walker
                .scan(&mut thread, 1, pages, cancel)
                .await?
                .into_values()
                .collect()
        };

        let found = posts
            .iter()
            .find(|candidate| {
                candidate.author_link() == Some(author_link) && candidate.created() == Some(created)
            })
            .ok_or_else(|| {
                HarvestError::EnrichmentImpossible(format!(
                    "no post by {} at {} in {}",
                    author_link, created, thread_link
                ))
            })?;

        post.absorb(found);
        Ok(())
    }
}
