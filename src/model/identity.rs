//! Equality and hashing for partially known posts
//!
//! Two posts are the same post if any of these holds, checked in order:
//!
//! | Tier | Both posts know                         | Compared                      |
//! |------|-----------------------------------------|-------------------------------|
//! | 1    | direct link                             | links equal                   |
//! | 2    | thread link + position                  | both equal                    |
//! | 3    | thread link + creation time + author    | all three equal               |
//! | -    | none of the above                       | same instance (clones only)   |
//!
//! When both posts know their direct link, the link decides alone: distinct
//! links are distinct posts whatever their position or authorship says.
//!
//! The hash is the thread link. Every tier implies equal thread links (a
//! direct link always carries its thread), so equal posts hash equally even
//! when they are known through different tiers. Posts with no thread link
//! hash by instance and only ever match their own clones.

use crate::model::Post;
use std::hash::{Hash, Hasher};

/// Which rule made two posts equal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Link,
    Position,
    AuthorTime,
    Instance,
}

/// Returns the first rule under which `a` and `b` are the same post
pub fn match_tier(a: &Post, b: &Post) -> Option<MatchTier> {
    if let (Some(x), Some(y)) = (&a.link, &b.link) {
        return (x == y).then_some(MatchTier::Link);
    }

    if let (Some(ta), Some(tb)) = (&a.thread_link, &b.thread_link) {
        if ta == tb {
            if let (Some(pa), Some(pb)) = (a.position, b.position) {
                if pa == pb {
                    return Some(MatchTier::Position);
                }
            }

            if let (Some(ca), Some(cb), Some(ua), Some(ub)) =
                (a.created, b.created, &a.author_link, &b.author_link)
            {
                if ca == cb && ua == ub {
                    return Some(MatchTier::AuthorTime);
                }
            }
        }
    }

    if a.instance == b.instance {
        return Some(MatchTier::Instance);
    }

    None
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        match_tier(self, other).is_some()
    }
}

impl Eq for Post {}

impl Hash for Post {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.thread_link {
            Some(thread) => {
                0u8.hash(state);
                thread.hash(state);
            }
            None => {
                1u8.hash(state);
                self.instance.hash(state);
            }
        }
    }
}
