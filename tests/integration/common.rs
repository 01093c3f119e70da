//! Synthetic forum pages and an in-memory page source

use async_trait::async_trait;
use forum_harvest::crawler::{
    EventSink, Fetcher, PageSource, PaginationWalker, RetryPolicy,
};
use forum_harvest::{Extractor, HarvestError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HOST: &str = "https://forum.example.com";

/// Serves canned pages and counts every request per URL
#[derive(Default)]
pub struct MapSource {
    pages: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: impl Into<String>, html: impl Into<String>) -> &Self {
        self.pages.lock().unwrap().insert(url.into(), html.into());
        self
    }

    /// The next `times` requests for `url` fail with a transient error
    pub fn fail(&self, url: impl Into<String>, times: u32) -> &Self {
        self.failures.lock().unwrap().insert(url.into(), times);
        self
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PageSource for MapSource {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(HarvestError::TransientNetwork {
                    url: url.to_string(),
                    message: "connection reset".to_string(),
                });
            }
        }

        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| HarvestError::TransientNetwork {
                url: url.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            })
    }
}

/// Walker over the in-memory source with no delays and three attempts
pub fn walker(source: Arc<MapSource>, sink: Arc<dyn EventSink>) -> PaginationWalker {
    PaginationWalker::new(
        Fetcher::new(source, Duration::ZERO),
        Extractor::new(HOST, ',').unwrap(),
        RetryPolicy::new(3, Duration::ZERO),
        sink,
    )
}

pub fn thread_url(topic: u64, page: u32) -> String {
    format!("{HOST}/index.php?topic={topic}.{}", (page - 1) * 20)
}

pub fn view_all_url(topic: u64) -> String {
    format!("{HOST}/index.php?topic={topic}.0;all")
}

pub fn board_url(board: u64, page: u32) -> String {
    format!("{HOST}/index.php?board={board}.{}", (page - 1) * 40)
}

pub fn message_id(topic: u64, position: u32) -> u64 {
    topic * 1000 + u64::from(position)
}

pub fn post_url(topic: u64, position: u32) -> String {
    let msg = message_id(topic, position);
    format!("{HOST}/index.php?topic={topic}.msg{msg}#msg{msg}")
}

pub fn author_url(author: u32) -> String {
    format!("{HOST}/index.php?action=profile;u={author}")
}

/// Date string shown on a synthetic post; unique per position below 720
pub fn post_date(position: u32) -> String {
    let hour = position / 60 % 12 + 1;
    let minute = position % 60;
    format!("March 01, 2023, {hour:02}:{minute:02}:00 AM")
}

pub fn post_block(topic: u64, position: u32, author: u32) -> String {
    let msg = message_id(topic, position);
    let date = post_date(position);
    format!(
        r#"<div class="post_wrapper">
  <div class="poster"><h4><a href="index.php?action=profile;u={author}">user{author}</a></h4></div>
  <div class="postarea">
    <div class="keyinfo">
      <h5><a href="index.php?topic={topic}.msg{msg}#msg{msg}">Re: Topic {topic}</a></h5>
      <a class="message_number" href="index.php?topic={topic}.msg{msg}#msg{msg}">#{position}</a>
      <div class="smalltext">« on: {date} »</div>
    </div>
    <div class="post"><div class="inner" id="msg_{msg}">Body of post {position}</div></div>
  </div>
</div>"#
    )
}

/// One thread page holding the given positions
///
/// `pages` is the thread's total page count as advertised by the page links.
pub fn thread_page(topic: u64, positions: impl IntoIterator<Item = u32>, pages: u32, view_all: bool) -> String {
    let mut links: Vec<String> = (1..=pages)
        .map(|p| {
            format!(
                r#"<a class="navPages" href="index.php?topic={topic}.{}">{p}</a>"#,
                (p - 1) * 20
            )
        })
        .collect();
    if view_all {
        links.push(format!(r#"<a class="navPages" href="index.php?topic={topic}.0;all">All</a>"#));
    }

    let posts: Vec<String> = positions
        .into_iter()
        .map(|position| post_block(topic, position, position % 5 + 1))
        .collect();

    format!(
        r#"<html><body>
<div id="upper_section"><span id="time_now" class="smalltext">April 05, 2024, 09:12:44 AM</span></div>
<div class="pagelinks">{}</div>
{}
</body></html>"#,
        links.join(" "),
        posts.join("\n")
    )
}

/// Positions shown on a one-based page of a thread with `total` posts
pub fn positions_on(page: u32, total: u32) -> std::ops::RangeInclusive<u32> {
    let first = (page - 1) * 20 + 1;
    first..=total.min(page * 20)
}

/// Registers every page of a thread with `total` posts
pub fn serve_thread(source: &MapSource, topic: u64, total: u32, view_all: bool) {
    let pages = total.div_ceil(20).max(1);
    for page in 1..=pages {
        source.page(
            thread_url(topic, page),
            thread_page(topic, positions_on(page, total), pages, view_all),
        );
    }
    if view_all {
        source.page(view_all_url(topic), thread_page(topic, 1..=total, pages, false));
    }
}

/// One board page listing `(topic, title, thread page count)` rows
pub fn board_page(board: u64, rows: &[(u64, &str, u32)], board_pages: u32) -> String {
    let listings: Vec<String> = rows
        .iter()
        .map(|(topic, title, pages)| {
            let cluster = if *pages > 1 {
                let links: Vec<String> = (1..=*pages)
                    .map(|p| {
                        format!(
                            r#"<a class="navPages" href="index.php?topic={topic}.{}">{p}</a>"#,
                            (p - 1) * 20
                        )
                    })
                    .collect();
                format!(r#"<small id="pages{topic}">« {} »</small>"#, links.join(" "))
            } else {
                String::new()
            };
            format!(
                r#"<tr><td class="subject windowbg2"><div>
  <span id="msg_{topic}000"><a href="index.php?topic={topic}.0">{title}</a></span>
  {cluster}
</div></td></tr>"#
            )
        })
        .collect();

    let links: Vec<String> = (1..=board_pages)
        .map(|p| {
            format!(
                r#"<a class="navPages" href="index.php?board={board}.{}">{p}</a>"#,
                (p - 1) * 40
            )
        })
        .collect();

    format!(
        r#"<html><body>
<div class="pagelinks">{}</div>
<table class="table_grid">{}</table>
</body></html>"#,
        links.join(" "),
        listings.concat()
    )
}
