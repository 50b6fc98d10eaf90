// src/ingest/providers/blocks.rs
//! Block listings split on a recurring marker (Meetup's `eventCard--link`).
//! Each block carries an `<h3>` title, a machine-readable `datetime="…"`
//! attribute and an `href="…"` link, usually relative.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{first_h3, first_href, non_empty_text};
use crate::ingest::types::{Extractor, RawEvent};

static RE_DATETIME_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)datetime\s*=\s*"([^"]+)""#).expect("datetime regex"));

#[derive(Debug, Clone)]
pub struct BlockExtractor {
    marker: String,
    default_title: Option<String>,
}

impl BlockExtractor {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            default_title: None,
        }
    }

    /// Title used for blocks whose heading is missing.
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = Some(title.into());
        self
    }
}

impl Extractor for BlockExtractor {
    fn extract(&self, document: &str) -> Vec<RawEvent> {
        if self.marker.is_empty() {
            return Vec::new();
        }
        document
            .split(self.marker.as_str())
            .skip(1)
            .map(|block| RawEvent {
                title: first_h3(block)
                    .and_then(non_empty_text)
                    .or_else(|| self.default_title.clone()),
                start: RE_DATETIME_ATTR
                    .captures(block)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string()),
                location: None,
                link: first_href(block),
            })
            .collect()
    }

    fn kind(&self) -> &'static str {
        "blocks"
    }
}
