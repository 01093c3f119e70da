use super::clean::{normalize_blocks, render_text, replace_smileys, strip_noise};
use super::date::{parse_reference_date, resolve_timestamp};
use super::{first, structural, text_of, Extractor, RecordError, RecordFailure, ThreadPage};
use crate::model::{Post, PostFields};
use crate::url::{parse_href, ForumLink};
use crate::HarvestError;
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static POST_WRAPPER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post_wrapper").unwrap());

static TIME_NOW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#time_now.smalltext").unwrap());

static SMALLTEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".smalltext").unwrap());

static MESSAGE_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.keyinfo a.message_number").unwrap());

static SUBJECT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.keyinfo h5 a").unwrap());

static POST_DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.keyinfo div.smalltext").unwrap());

static POSTER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.poster h4 a").unwrap());

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post div.inner").unwrap());

impl Extractor {
    /// Extracts every post on one thread page
    ///
    /// # Pipeline
    ///
    /// 1. Break lines after block-level closing tags
    /// 2. Substitute smiley images
    /// 3. Detach quotes, code blocks, their trailing breaks, and avatars
    /// 4. Segment into `div.post_wrapper` containers, skipping a container
    ///    whose text repeats the previous one
    /// 5. Parse each container; fall back to position + body; else drop it
    ///
    /// # Arguments
    ///
    /// * `html` - Raw page markup
    /// * `thread_link` - Unfinished link of the thread the page belongs to
    /// * `page_url` - Where the page came from, for error messages
    ///
    /// # Errors
    ///
    /// Returns `StructuralMismatch` if the page has no post containers.
    pub fn thread_page(
        &self,
        html: &str,
        thread_link: &str,
        page_url: &str,
    ) -> Result<ThreadPage, HarvestError> {
        let html = normalize_blocks(html);
        let html = replace_smileys(&html, self.smiley_substitute);
        let mut document = Html::parse_document(&html);

        let reference = reference_date(&document);
        let pagination = self.pagination(&document);
        strip_noise(&mut document);

        let containers: Vec<ElementRef<'_>> = document.select(&POST_WRAPPER).collect();
        if containers.is_empty() {
            return Err(structural(page_url, "no div.post_wrapper containers"));
        }

        let mut posts = Vec::with_capacity(containers.len());
        let mut failures = Vec::new();
        let mut previous_text: Option<String> = None;

        for (index, container) in containers.into_iter().enumerate() {
            let text: String = container.text().collect();
            if previous_text.as_deref() == Some(text.as_str()) {
                tracing::debug!("Skipping duplicated post container {} on {}", index, page_url);
                continue;
            }
            previous_text = Some(text);

            match self.parse_post(container, reference) {
                Ok(post) => posts.push(post),
                Err(full_error) => match parse_reduced(container, thread_link) {
                    Ok(post) => {
                        tracing::debug!(
                            "Post {} on {} reduced to position and body: {}",
                            index,
                            page_url,
                            full_error
                        );
                        posts.push(post);
                    }
                    Err(reduced_error) => failures.push(RecordFailure {
                        index,
                        message: format!(
                            "post {index} on {page_url}: {full_error}; fallback: {reduced_error}"
                        ),
                    }),
                },
            }
        }

        Ok(ThreadPage {
            posts,
            failures,
            pagination,
        })
    }

    fn parse_post(
        &self,
        container: ElementRef<'_>,
        reference: Option<NaiveDate>,
    ) -> Result<Post, RecordError> {
        let number = first(container, &MESSAGE_NUMBER).ok_or(RecordError::Missing("message number"))?;
        let position = parse_position(&text_of(number))?;
        let (topic, message_id) = match number
            .value()
            .attr("href")
            .and_then(|href| parse_href(&self.base, href))
        {
            Some(ForumLink::Post { topic, message, .. }) => (topic, message),
            _ => return Err(RecordError::BadLink("message number")),
        };

        let poster = first(container, &POSTER).ok_or(RecordError::Missing("author"))?;
        let author = text_of(poster);
        if author.is_empty() {
            return Err(RecordError::Missing("author name"));
        }
        let author_link = poster
            .value()
            .attr("href")
            .and_then(|href| self.resolve(href))
            .ok_or(RecordError::BadLink("author"))?;

        let title = first(container, &SUBJECT)
            .map(text_of)
            .ok_or(RecordError::Missing("subject"))?;

        let date = first(container, &POST_DATE).ok_or(RecordError::Missing("date"))?;
        let created = resolve_timestamp(&date.text().collect::<String>(), reference)?;

        let body = first(container, &BODY).ok_or(RecordError::Missing("body"))?;

        Ok(Post::complete(PostFields {
            host: self.host.clone(),
            topic,
            message_id,
            position,
            author,
            author_link,
            title,
            created,
            body: render_text(body),
        }))
    }
}

/// Position and body only, for containers whose other fields are unreadable
fn parse_reduced(container: ElementRef<'_>, thread_link: &str) -> Result<Post, RecordError> {
    let number = first(container, &MESSAGE_NUMBER).ok_or(RecordError::Missing("message number"))?;
    let position = parse_position(&text_of(number))?;
    let body = first(container, &BODY).ok_or(RecordError::Missing("body"))?;
    Ok(Post::reduced(thread_link, position, render_text(body)))
}

/// `#12` -> 12; positions start at 1
fn parse_position(text: &str) -> Result<u32, RecordError> {
    text.trim()
        .trim_start_matches('#')
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|position| *position > 0)
        .ok_or_else(|| RecordError::BadPosition(text.to_string()))
}

/// The page-level "today" date, read once per page
///
/// Prefers `#time_now`; otherwise the first `.smalltext` outside any post
/// that holds a date.
fn reference_date(document: &Html) -> Option<NaiveDate> {
    if let Some(node) = document.select(&TIME_NOW).next() {
        return parse_reference_date(&node.text().collect::<String>());
    }

    document
        .select(&SMALLTEXT)
        .filter(|node| {
            !node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| ancestor.value().classes().any(|class| class == "post_wrapper"))
        })
        .find_map(|node| parse_reference_date(&node.text().collect::<String>()))
}
