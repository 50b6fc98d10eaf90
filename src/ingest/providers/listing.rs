// src/ingest/providers/listing.rs
//! Listing pages: a run of `<h3>` titles, each followed by a `<p>` carrying
//! the date text (Charleston Digital Corridor style).

use once_cell::sync::Lazy;
use regex::Regex;

use super::{first_href, headings, non_empty_text};
use crate::ingest::types::{Extractor, RawEvent};

static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").expect("paragraph regex"));

#[derive(Debug, Default, Clone, Copy)]
pub struct ListingExtractor;

impl Extractor for ListingExtractor {
    fn extract(&self, document: &str) -> Vec<RawEvent> {
        headings(document)
            .iter()
            .map(|h| {
                let start = RE_PARAGRAPH
                    .captures(h.body(document))
                    .and_then(|c| c.get(1))
                    .and_then(|m| non_empty_text(m.as_str()));
                RawEvent {
                    title: non_empty_text(h.inner),
                    start,
                    location: None,
                    link: first_href(h.inner),
                }
            })
            .collect()
    }

    fn kind(&self) -> &'static str {
        "listing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_heading_with_following_paragraph() {
        let html = r#"
            <div class="event"><h3 class="title"><a href="/events/ai-meetup">AI &amp; ML Meetup</a></h3>
              <p class="date">Nov 14, 2025 6:00 PM</p></div>
            <div class="event"><h3>Founders Breakfast</h3></div>
            <div class="event"><h3>Code &amp; Coffee</h3><p>December 3, 2025</p></div>
        "#;
        let out = ListingExtractor.extract(html);
        assert_eq!(out.len(), 3);

        assert_eq!(out[0].title.as_deref(), Some("AI & ML Meetup"));
        assert_eq!(out[0].start.as_deref(), Some("Nov 14, 2025 6:00 PM"));
        assert_eq!(out[0].link.as_deref(), Some("/events/ai-meetup"));

        // no paragraph before the next heading: the date must not leak across
        assert_eq!(out[1].title.as_deref(), Some("Founders Breakfast"));
        assert_eq!(out[1].start, None);

        assert_eq!(out[2].start.as_deref(), Some("December 3, 2025"));
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(ListingExtractor.extract("<html><h3 unterminated").is_empty());
        assert!(ListingExtractor.extract("").is_empty());
    }
}
