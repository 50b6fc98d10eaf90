// src/ingest/types.rs
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use url::Url;

/// Partial record as produced by one extractor. Any field may be missing or junk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub title: Option<String>,
    pub start: Option<String>, // unparsed date text
    pub location: Option<String>,
    pub link: Option<String>,
}

impl RawEvent {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Canonical event as it appears in the feed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub title: String,
    #[serde(serialize_with = "serialize_instant")]
    pub start_date: DateTime<Utc>,
    pub location: String,
    pub link: String,
}

/// `2025-11-15T22:00:00.000Z`
pub fn format_instant(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_instant<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_instant(ts))
}

#[derive(Debug, Serialize)]
pub struct FeedPayload<'a> {
    pub events: &'a [EventRecord],
}

/// Markup-specific extraction strategy. Must not panic on malformed input;
/// a document it does not understand simply yields fewer records.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &str) -> Vec<RawEvent>;
    fn kind(&self) -> &'static str;
}

/// One configured upstream source.
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    pub base: Url,
    pub default_location: String,
    pub extractor: Box<dyn Extractor>,
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("kind", &self.extractor.kind())
            .finish()
    }
}

impl SourceDescriptor {
    /// Fill in source-specific defaults: placeholder location, page URL as link,
    /// relative links resolved against the base URL.
    pub fn complete(&self, mut ev: RawEvent) -> RawEvent {
        let has_location = ev
            .location
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
        if !has_location {
            ev.location = Some(self.default_location.clone());
        }

        ev.link = match ev.link.as_deref().map(str::trim) {
            Some(href) if !href.is_empty() => match self.base.join(href) {
                Ok(abs) => Some(abs.to_string()),
                Err(_) => Some(self.url.clone()),
            },
            _ => Some(self.url.clone()),
        };
        ev
    }
}
