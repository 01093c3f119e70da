use crate::UrlError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static BOARD_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<host>https?://[^\s?#]+)/index\.php\?board=(?P<id>\d+)\.(?P<offset>\d+)$")
        .unwrap()
});

static THREAD_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<host>https?://[^\s?#]+)/index\.php\?topic=(?P<id>\d+)\.(?P<offset>\d+)$")
        .unwrap()
});

static POST_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<host>https?://[^\s?#]+)/index\.php\?topic=(?P<topic>\d+)\.msg(?P<msg>\d+)#msg(?P<anchor>\d+)$",
    )
    .unwrap()
});

static THREAD_BASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<host>https?://[^\s?#]+)/index\.php\?topic=(?P<id>\d+)\.$").unwrap()
});

/// Marker SMF appends to a thread link to render every post on one page
pub const VIEW_ALL_MARKER: &str = ";all";

/// A forum URL that matched one of the three link grammars
///
/// ```text
/// Board  <host>/index.php?board=<id>.<offset>
/// Thread <host>/index.php?topic=<id>.<offset>
/// Post   <host>/index.php?topic=<topic>.msg<message>#msg<message>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForumLink {
    Board { host: String, id: u64, offset: u32 },
    Thread { host: String, id: u64, offset: u32 },
    Post { host: String, topic: u64, message: u64 },
}

impl ForumLink {
    /// Parses a URL against the strict link grammars
    ///
    /// # Examples
    ///
    /// ```
    /// use forum_harvest::url::ForumLink;
    ///
    /// let link = ForumLink::parse("https://forum.example.com/index.php?topic=12.40").unwrap();
    /// assert_eq!(link.id(), 12);
    /// assert_eq!(link.offset(), Some(40));
    /// ```
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        let url = url.trim();

        if let Some(caps) = BOARD_LINK.captures(url) {
            return Ok(Self::Board {
                host: caps["host"].to_string(),
                id: parse_number(&caps["id"], url)?,
                offset: parse_number(&caps["offset"], url)?,
            });
        }

        if let Some(caps) = THREAD_LINK.captures(url) {
            return Ok(Self::Thread {
                host: caps["host"].to_string(),
                id: parse_number(&caps["id"], url)?,
                offset: parse_number(&caps["offset"], url)?,
            });
        }

        if let Some(caps) = POST_LINK.captures(url) {
            if caps["msg"] != caps["anchor"] {
                return Err(UrlError::Malformed(format!(
                    "{url}: message id and anchor disagree"
                )));
            }
            return Ok(Self::Post {
                host: caps["host"].to_string(),
                topic: parse_number(&caps["topic"], url)?,
                message: parse_number(&caps["msg"], url)?,
            });
        }

        Err(UrlError::Malformed(url.to_string()))
    }

    /// Short name of the link kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Board { .. } => "board",
            Self::Thread { .. } => "thread",
            Self::Post { .. } => "post",
        }
    }

    pub fn host(&self) -> &str {
        match self {
            Self::Board { host, .. } | Self::Thread { host, .. } | Self::Post { host, .. } => host,
        }
    }

    /// Board id, thread id, or (for posts) the owning thread id
    pub fn id(&self) -> u64 {
        match self {
            Self::Board { id, .. } | Self::Thread { id, .. } => *id,
            Self::Post { topic, .. } => *topic,
        }
    }

    /// Page offset carried in the URL; posts have none
    pub fn offset(&self) -> Option<u32> {
        match self {
            Self::Board { offset, .. } | Self::Thread { offset, .. } => Some(*offset),
            Self::Post { .. } => None,
        }
    }

    /// Serializes back into the canonical URL
    pub fn to_url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ForumLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board { host, id, offset } => write!(f, "{}{}", board_base(host, *id), offset),
            Self::Thread { host, id, offset } => write!(f, "{}{}", thread_base(host, *id), offset),
            Self::Post {
                host,
                topic,
                message,
            } => f.write_str(&post_link(host, *topic, *message)),
        }
    }
}

fn parse_number<T: std::str::FromStr>(digits: &str, url: &str) -> Result<T, UrlError> {
    digits
        .parse()
        .map_err(|_| UrlError::Malformed(format!("{url}: number out of range")))
}

/// Board link without its page offset
pub fn board_base(host: &str, id: u64) -> String {
    format!("{host}/index.php?board={id}.")
}

/// Thread link without its page offset (the "unfinished" container link)
pub fn thread_base(host: &str, id: u64) -> String {
    format!("{host}/index.php?topic={id}.")
}

/// Direct link to a single post
pub fn post_link(host: &str, topic: u64, message: u64) -> String {
    format!("{host}/index.php?topic={topic}.msg{message}#msg{message}")
}

/// Splits an unfinished thread link back into host and thread id
pub fn parse_thread_base(base: &str) -> Result<(String, u64), UrlError> {
    let caps = THREAD_BASE
        .captures(base.trim())
        .ok_or_else(|| UrlError::Malformed(base.to_string()))?;
    Ok((caps["host"].to_string(), parse_number(&caps["id"], base)?))
}

/// Zero-based URL offset of a one-based page number
pub fn page_offset(page: u32, step: u32) -> u32 {
    page.saturating_sub(1) * step
}

/// Full URL of a page given a base link
pub fn page_url(base: &str, page: u32, step: u32) -> String {
    format!("{base}{}", page_offset(page, step))
}

/// Strips a trailing view-all marker, reporting whether one was present
///
/// ```
/// use forum_harvest::url::strip_view_all;
///
/// let (link, all) = strip_view_all("https://f.example/index.php?topic=3.0;all");
/// assert_eq!(link, "https://f.example/index.php?topic=3.0");
/// assert!(all);
/// ```
pub fn strip_view_all(link: &str) -> (&str, bool) {
    match link.strip_suffix(VIEW_ALL_MARKER) {
        Some(stripped) => (stripped, true),
        None => (link, false),
    }
}
