//! URL handling module for Forum-Harvest
//!
//! This module implements the forum's link grammar (boards, threads, posts),
//! page offset arithmetic, and resolution of hrefs found on rendered pages.

mod link;
mod normalize;

// Re-export main functions
pub use link::{
    board_base, page_offset, page_url, parse_thread_base, post_link, strip_view_all, thread_base,
    ForumLink, VIEW_ALL_MARKER,
};
pub use normalize::{host_base, normalize_host, resolve_href};

/// Records per board page; board offsets step by this value
pub const BOARD_PAGE_SIZE: u32 = 40;

/// Records per thread page; thread offsets step by this value
pub const THREAD_PAGE_SIZE: u32 = 20;

/// Resolves an href and parses it as a forum link in one step
///
/// # Arguments
///
/// * `base` - Host base from [`host_base`]
/// * `href` - Raw attribute value as found in the markup
///
/// # Returns
///
/// The parsed link, or None if the href is unusable or does not match any
/// link grammar
pub fn parse_href(base: &::url::Url, href: &str) -> Option<ForumLink> {
    resolve_href(base, href).and_then(|absolute| ForumLink::parse(&absolute).ok())
}
