//! Data model for boards, threads and posts
//!
//! # Components
//!
//! - `Board`: a forum section whose pages list threads (40 per page)
//! - `Thread`: a topic whose pages list posts (20 per page), with its page cache
//! - `Post`: a single post, complete or known only by an identifying subset
//! - `identity`: the equality and hashing rules for partially known posts

mod board;
pub mod identity;
mod post;
mod thread;

// Re-export main types
pub(crate) use post::PostFields;
pub use board::Board;
pub use identity::{match_tier, MatchTier};
pub use post::{canonical_thread_link, Post};
pub use thread::{page_of_position, slot_index, PageSlots, Thread};
