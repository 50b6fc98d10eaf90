// src/ingest/providers/json_api.rs
//! Structured events API. No markup scraping: the JSON fields are mapped onto
//! the raw record directly.

use serde::Deserialize;
use serde_json::Value;

use super::non_empty_text;
use crate::ingest::types::{format_instant, Extractor, RawEvent};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    List(Vec<ApiEvent>),
    Events { events: Vec<ApiEvent> },
    Data { data: Vec<ApiEvent> },
    Results { results: Vec<ApiEvent> },
}

impl Envelope {
    fn into_events(self) -> Vec<ApiEvent> {
        match self {
            Envelope::List(v)
            | Envelope::Events { events: v }
            | Envelope::Data { data: v }
            | Envelope::Results { results: v } => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    #[serde(default, alias = "name")]
    title: Option<String>,
    #[serde(
        default,
        alias = "startDate",
        alias = "start_date",
        alias = "dateTime",
        alias = "start_time"
    )]
    start: Option<Value>,
    #[serde(default, alias = "venue")]
    location: Option<Location>,
    #[serde(default, alias = "url", alias = "eventUrl")]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Location {
    Text(String),
    Venue { name: Option<String> },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonApiExtractor;

impl Extractor for JsonApiExtractor {
    fn extract(&self, document: &str) -> Vec<RawEvent> {
        let envelope: Envelope = match serde_json::from_str(document) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(target: "feed", error = %e, "events api returned unexpected json");
                return Vec::new();
            }
        };

        envelope
            .into_events()
            .into_iter()
            .map(|ev| RawEvent {
                title: ev.title.as_deref().and_then(non_empty_text),
                start: ev.start.and_then(start_text),
                location: ev.location.and_then(|l| match l {
                    Location::Text(s) => Some(s),
                    Location::Venue { name } => name,
                }),
                link: ev.link,
            })
            .collect()
    }

    fn kind(&self) -> &'static str {
        "json_api"
    }
}

/// Strings pass through; numbers are epoch seconds or milliseconds.
fn start_text(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            let ts = if raw.unsigned_abs() >= 100_000_000_000 {
                chrono::DateTime::from_timestamp_millis(raw)?
            } else {
                chrono::DateTime::from_timestamp(raw, 0)?
            };
            Some(format_instant(&ts))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_aliased_fields_from_wrapped_list() {
        let doc = r#"{"events":[
            {"name":"Cloud Native Charleston","dateTime":"2025-11-18T18:00:00-05:00",
             "venue":{"name":"The Harbor Entrepreneur Center"},"eventUrl":"https://example.org/e/1"},
            {"title":"Open Coffee","start":1763740800000,"location":"Kudu Coffee"},
            {"description":"no title here"}
        ]}"#;
        let out = JsonApiExtractor.extract(doc);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].title.as_deref(), Some("Cloud Native Charleston"));
        assert_eq!(
            out[0].location.as_deref(),
            Some("The Harbor Entrepreneur Center")
        );
        assert_eq!(out[0].link.as_deref(), Some("https://example.org/e/1"));
        assert_eq!(out[1].start.as_deref(), Some("2025-11-21T16:00:00.000Z"));
        assert_eq!(out[1].location.as_deref(), Some("Kudu Coffee"));
        assert_eq!(out[2].title, None);
    }

    #[test]
    fn bare_array_and_epoch_seconds() {
        let out = JsonApiExtractor.extract(r#"[{"title":"x","start_date":1763740800}]"#);
        assert_eq!(out[0].start.as_deref(), Some("2025-11-21T16:00:00.000Z"));
    }

    #[test]
    fn out_of_range_epoch_is_dropped_not_fatal() {
        let doc = r#"[
            {"title":"min","start":-9223372036854775808},
            {"title":"max","start":9223372036854775807},
            {"title":"float","start":1.5e300}
        ]"#;
        let out = JsonApiExtractor.extract(doc);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|e| e.start.is_none()), "{out:?}");
        assert_eq!(out[0].title.as_deref(), Some("min"));
    }

    #[test]
    fn invalid_json_yields_nothing() {
        assert!(JsonApiExtractor.extract("<html>nope</html>").is_empty());
        assert!(JsonApiExtractor.extract(r#"{"unexpected":true}"#).is_empty());
    }
}
