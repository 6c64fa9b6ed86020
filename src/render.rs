//! Markdown to HTML conversion for page content.
//!
//! CommonMark parsing and HTML output come from `pulldown-cmark`. The only
//! thing added on top is heading anchors: every heading without an explicit
//! `{#id}` gets one derived from its text. Generated ids never repeat within a
//! document and never take an id the author set explicitly.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render markdown to HTML.
///
/// Never fails: malformed markdown degrades to best-effort HTML, as
/// CommonMark defines it.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, parser_options()).collect();
    let mut ids = HeadingIds::default();
    for event in &events {
        if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
            ids.reserve(id);
        }
    }

    for i in 0..events.len() {
        if !matches!(events[i], Event::Start(Tag::Heading { id: None, .. })) {
            continue;
        }
        let text = heading_text(&events[i + 1..]);
        let Some(anchor) = ids.next(&text) else {
            continue;
        };
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(anchor));
        }
    }

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events.into_iter());
    output
}

/// Concatenated text of a heading, starting right after its `Start` event.
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}

/// Hands out unique heading ids within one document.
#[derive(Default)]
struct HeadingIds {
    taken: HashSet<String>,
    suffixes: HashMap<String, usize>,
}

impl HeadingIds {
    fn reserve(&mut self, id: &str) {
        self.taken.insert(id.to_string());
    }

    /// `None` when the heading text has nothing to build an id from.
    fn next(&mut self, text: &str) -> Option<String> {
        let base = anchor_slug(text);
        if base.is_empty() {
            return None;
        }
        let suffix = self.suffixes.entry(base.clone()).or_insert(0);
        let mut candidate = base.clone();
        while self.taken.contains(&candidate) {
            *suffix += 1;
            candidate = format!("{base}-{suffix}");
        }
        self.taken.insert(candidate.clone());
        Some(candidate)
    }
}

/// Lowercase anchor form of heading text: ASCII alphanumerics kept,
/// whitespace, dashes and underscores collapse into single dashes.
fn anchor_slug(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}
