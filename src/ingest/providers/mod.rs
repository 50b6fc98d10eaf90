// src/ingest/providers/mod.rs
//! Markup-specific extractors, one per source layout.
//!
//! All of them are regex/pattern based: the pages have no schema and no
//! stability guarantee, so a layout change shows up as "zero events" rather
//! than an error.

pub mod blocks;
pub mod cards;
pub mod json_api;
pub mod listing;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_H3: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h3(?:\s[^>]*)?>(.*?)</h3>").expect("h3 regex"));
static RE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href\s*=\s*"([^"]+)""#).expect("href regex"));

/// An `<h3>` heading: inner markup plus the byte range of the whole element.
pub(crate) struct Heading<'a> {
    pub inner: &'a str,
    pub end: usize,
    pub next_start: usize,
}

/// All `<h3>` headings in document order. `next_start` is where the following
/// heading begins (or the end of the document), so `[end, next_start)` is the
/// body belonging to this heading.
pub(crate) fn headings(document: &str) -> Vec<Heading<'_>> {
    let found: Vec<(usize, usize, &str)> = RE_H3
        .captures_iter(document)
        .filter_map(|c| {
            let whole = c.get(0)?;
            Some((whole.start(), whole.end(), c.get(1)?.as_str()))
        })
        .collect();

    found
        .iter()
        .enumerate()
        .map(|(i, &(_, end, inner))| Heading {
            inner,
            end,
            next_start: found.get(i + 1).map_or(document.len(), |n| n.0),
        })
        .collect()
}

impl<'a> Heading<'a> {
    pub fn body(&self, document: &'a str) -> &'a str {
        document.get(self.end..self.next_start).unwrap_or_default()
    }
}

pub(crate) fn first_h3(fragment: &str) -> Option<&str> {
    RE_H3
        .captures(fragment)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub(crate) fn first_href(fragment: &str) -> Option<String> {
    RE_HREF
        .captures(fragment)
        .and_then(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
}

/// Cleaned text, `None` when nothing is left.
pub(crate) fn non_empty_text(raw: &str) -> Option<String> {
    let t = crate::ingest::normalize_text(raw);
    (!t.is_empty()).then_some(t)
}
