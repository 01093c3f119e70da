//! Presentation-noise stripping for post bodies
//!
//! Runs in a fixed order: block tags are normalized and smileys substituted
//! on the raw markup, then quotes, code blocks and avatars are detached from
//! the parsed tree, and finally the body is rendered to text with links
//! unwrapped. Quotes must be gone before rendering, otherwise link text inside
//! a quote would end up in the outer post's body.

use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::borrow::Cow;
use std::sync::LazyLock;

static BLOCK_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(?:div|p|blockquote|li|ul|ol|table|tr|td|pre|h[1-6])\s*>").unwrap()
});

/// Any image served from the forum's smiley directory
static SMILEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["'][^"']*/Smileys/[^"']*["'][^>]*>"#).unwrap()
});

static QUOTE_OR_CODE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "div.post_wrapper div.quoteheader, div.post_wrapper blockquote, \
         div.post_wrapper div.quotefooter, div.post_wrapper div.codeheader, \
         div.post_wrapper code",
    )
    .unwrap()
});

static AVATAR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.post_wrapper img.avatar").unwrap());

/// Appends a line break after every block-level closing tag
///
/// Keeps text from adjacent blocks apart once tags are stripped.
pub fn normalize_blocks(html: &str) -> Cow<'_, str> {
    BLOCK_CLOSE.replace_all(html, "$0\n")
}

/// Replaces every smiley image with the substitute character
pub fn replace_smileys(html: &str, substitute: char) -> Cow<'_, str> {
    let mut buf = [0u8; 4];
    let replacement: &str = substitute.encode_utf8(&mut buf);
    SMILEY.replace_all(html, regex::NoExpand(replacement))
}

/// Detaches quote, code and avatar fragments from every post
///
/// Line breaks that directly follow a removed fragment inside the same
/// parent are dropped too, so a reply does not start with blank lines.
/// Returns the number of fragments removed.
pub fn strip_noise(document: &mut Html) -> usize {
    let mut doomed: Vec<NodeId> = Vec::new();

    for fragment in document.select(&QUOTE_OR_CODE) {
        doomed.push(fragment.id());
        doomed.extend(trailing_breaks(*fragment));
    }
    let fragments = doomed.len();

    doomed.extend(document.select(&AVATAR).map(|avatar| avatar.id()));

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    tracing::trace!("Stripped {} quote/code nodes", fragments);
    fragments
}

/// `<br>` siblings immediately after a node, skipping whitespace-only text
fn trailing_breaks(node: NodeRef<'_, Node>) -> Vec<NodeId> {
    let mut breaks = Vec::new();
    let mut next = node.next_sibling();

    while let Some(sibling) = next {
        match sibling.value() {
            Node::Text(text) if text.trim().is_empty() => {}
            Node::Element(element) if element.name() == "br" => breaks.push(sibling.id()),
            _ => break,
        }
        next = sibling.next_sibling();
    }

    breaks
}

/// Renders an element to plain text
///
/// Links are unwrapped (their text is kept, the href dropped) and `<br>`
/// becomes a newline. The result is passed through [`tidy`].
pub fn render_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_text(*element, &mut out);
    tidy(&out)
}

fn push_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if element.name() == "br" => out.push('\n'),
            Node::Element(_) => push_text(child, out),
            _ => {}
        }
    }
}

/// Trims every line and collapses runs of blank lines to one
pub fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !blank_run && !lines.is_empty() {
                lines.push("");
            }
            blank_run = true;
        } else {
            lines.push(line);
            blank_run = false;
        }
    }

    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}
