// src/ingest/providers/cards.rs
//! Card pages: an `<h3>` title with the date in a later `<span>` whose text
//! ends in a four-digit year (Startup Grind style). Cards without such a span
//! are skipped.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{first_href, headings, non_empty_text};
use crate::ingest::types::{Extractor, RawEvent};

static RE_DATE_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<span(?:\s[^>]*)?>([^<]*\d{4})\s*</span>").expect("date span regex")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct CardExtractor;

impl Extractor for CardExtractor {
    fn extract(&self, document: &str) -> Vec<RawEvent> {
        headings(document)
            .iter()
            .filter_map(|h| {
                let body = h.body(document);
                let date = RE_DATE_SPAN.captures(body)?.get(1)?.as_str();
                Some(RawEvent {
                    title: non_empty_text(h.inner),
                    start: non_empty_text(date),
                    location: None,
                    link: first_href(h.inner).or_else(|| first_href(body)),
                })
            })
            .collect()
    }

    fn kind(&self) -> &'static str {
        "cards"
    }
}
