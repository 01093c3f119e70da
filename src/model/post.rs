use crate::url::{parse_thread_base, post_link, thread_base, ForumLink};
use crate::{HarvestError, UrlError};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// A single forum post, possibly only partially known
///
/// A post can be known through three identifying subsets before it has been
/// fetched: its direct link, its position in a thread, or its author plus
/// creation time. Equality and hashing work on whichever subset is present
/// (see the `identity` module). The owning thread is referenced by its
/// unfinished link string, never by a live `Thread`.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    #[serde(skip)]
    pub(crate) instance: u64,
    pub(crate) link: Option<String>,
    pub(crate) message_id: Option<u64>,
    pub(crate) thread_link: Option<String>,
    pub(crate) position: Option<u32>,
    pub(crate) author: Option<String>,
    pub(crate) author_link: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) created: Option<NaiveDateTime>,
    pub(crate) body: Option<String>,
}

/// Every field the extractor reads for a fully parsed post
#[derive(Debug, Clone)]
pub(crate) struct PostFields {
    pub host: String,
    pub topic: u64,
    pub message_id: u64,
    pub position: u32,
    pub author: String,
    pub author_link: String,
    pub title: String,
    pub created: NaiveDateTime,
    pub body: String,
}

impl Post {
    fn empty() -> Self {
        Self {
            instance: next_instance(),
            link: None,
            message_id: None,
            thread_link: None,
            position: None,
            author: None,
            author_link: None,
            title: None,
            created: None,
            body: None,
        }
    }

    /// Partial post known only by its direct link
    ///
    /// # Errors
    ///
    /// Fails if the URL is not a post link.
    ///
    /// # Example
    ///
    /// ```
    /// use forum_harvest::Post;
    ///
    /// let post = Post::from_link("https://forum.example.com/index.php?topic=5.msg77#msg77").unwrap();
    /// assert_eq!(post.message_id(), Some(77));
    /// assert_eq!(post.thread_link(), Some("https://forum.example.com/index.php?topic=5."));
    /// assert!(!post.is_complete());
    /// ```
    pub fn from_link(url: &str) -> Result<Self, HarvestError> {
        match ForumLink::parse(url)? {
            ForumLink::Post {
                host,
                topic,
                message,
            } => {
                let mut post = Self::empty();
                post.link = Some(post_link(&host, topic, message));
                post.message_id = Some(message);
                post.thread_link = Some(thread_base(&host, topic));
                Ok(post)
            }
            other => Err(UrlError::UnexpectedKind {
                expected: "post",
                found: other.kind(),
            }
            .into()),
        }
    }

    /// Partial post known by its one-based position inside a thread
    ///
    /// `thread` may be any page URL of the thread or its unfinished base link.
    pub fn at_position(thread: &str, position: u32) -> Result<Self, HarvestError> {
        if position == 0 {
            return Err(HarvestError::InvalidInput(
                "post positions start at 1".to_string(),
            ));
        }
        let mut post = Self::empty();
        post.thread_link = Some(canonical_thread_link(thread)?);
        post.position = Some(position);
        Ok(post)
    }

    /// Partial post known by its author's profile link and creation time
    pub fn by_author(
        thread: &str,
        author_link: impl Into<String>,
        created: NaiveDateTime,
    ) -> Result<Self, HarvestError> {
        let author_link = author_link.into();
        if author_link.trim().is_empty() {
            return Err(HarvestError::InvalidInput(
                "author link cannot be empty".to_string(),
            ));
        }
        let mut post = Self::empty();
        post.thread_link = Some(canonical_thread_link(thread)?);
        post.author_link = Some(author_link);
        post.created = Some(created);
        Ok(post)
    }

    /// Fully parsed post; the thread link is derived from the post's own link
    pub(crate) fn complete(fields: PostFields) -> Self {
        let mut post = Self::empty();
        post.link = Some(post_link(&fields.host, fields.topic, fields.message_id));
        post.message_id = Some(fields.message_id);
        post.thread_link = Some(thread_base(&fields.host, fields.topic));
        post.position = Some(fields.position);
        post.author = Some(fields.author);
        post.author_link = Some(fields.author_link);
        post.title = Some(fields.title);
        post.created = Some(fields.created);
        post.body = Some(fields.body);
        post
    }

    /// Reduced post for markup where only the position and body could be read
    pub(crate) fn reduced(thread_link: &str, position: u32, body: String) -> Self {
        let mut post = Self::empty();
        post.thread_link = Some(thread_link.to_string());
        post.position = Some(position);
        post.body = Some(body);
        post
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn message_id(&self) -> Option<u64> {
        self.message_id
    }

    /// Unfinished link of the owning thread
    pub fn thread_link(&self) -> Option<&str> {
        self.thread_link.as_deref()
    }

    pub fn position(&self) -> Option<u32> {
        self.position
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn author_link(&self) -> Option<&str> {
        self.author_link.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn created(&self) -> Option<NaiveDateTime> {
        self.created
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// True once every display field is populated
    pub fn is_complete(&self) -> bool {
        self.link.is_some()
            && self.position.is_some()
            && self.author.is_some()
            && self.author_link.is_some()
            && self.title.is_some()
            && self.created.is_some()
            && self.body.is_some()
    }

    /// True once a body is known; enrichment stops touching the post from then on
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Copies every field the fetched post knows into this one
    ///
    /// The thread link and instance identity are left alone.
    pub(crate) fn absorb(&mut self, fetched: &Post) {
        fn fill<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        fill(&mut self.link, &fetched.link);
        fill(&mut self.message_id, &fetched.message_id);
        fill(&mut self.position, &fetched.position);
        fill(&mut self.author, &fetched.author);
        fill(&mut self.author_link, &fetched.author_link);
        fill(&mut self.title, &fetched.title);
        fill(&mut self.created, &fetched.created);
        fill(&mut self.body, &fetched.body);
    }
}

/// Accepts a thread page URL or an unfinished base link; returns the base link
pub fn canonical_thread_link(thread: &str) -> Result<String, UrlError> {
    if let Ok((host, id)) = parse_thread_base(thread) {
        return Ok(thread_base(&host, id));
    }
    match ForumLink::parse(thread)? {
        ForumLink::Thread { host, id, .. } => Ok(thread_base(&host, id)),
        other => Err(UrlError::UnexpectedKind {
            expected: "thread",
            found: other.kind(),
        }),
    }
}
