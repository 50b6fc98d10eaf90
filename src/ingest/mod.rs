// src/ingest/mod.rs
pub mod dates;
pub mod fetcher;
pub mod providers;
pub mod scheduler;
pub mod types;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::dates::normalize_date;
use crate::ingest::fetcher::{fetch_source, Transport};
use crate::ingest::types::{EventRecord, FeedPayload, RawEvent, SourceDescriptor};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_source_events_total",
            "Raw events extracted from live sources."
        );
        describe_counter!(
            "feed_source_errors_total",
            "Source fetches that failed or timed out."
        );
        describe_counter!(
            "feed_dropped_total",
            "Records dropped for missing title or duplicate title."
        );
        describe_counter!(
            "feed_date_fallback_total",
            "Records whose date could not be parsed and got the retrieval time."
        );
        describe_histogram!("feed_extract_ms", "Extractor run time in milliseconds.");
        describe_gauge!(
            "feed_last_refresh_ts",
            "Unix ts when the feed was last aggregated."
        );
    });
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Clean scraped text: strip tags, decode entities, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // Tags go first so that decoded `&lt;` text is not mistaken for markup.
    let out = RE_TAGS.replace_all(s, "");
    let out = html_escape::decode_html_entities(&out);
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// Result of the pure merge stage.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub events: Vec<EventRecord>,
    pub untitled: usize,
    pub duplicates: usize,
    pub date_fallbacks: usize,
}

/// Concatenate per-source results (configuration order) with the fallback
/// list, drop untitled records, normalize dates (substituting `now`), keep the
/// first record per title, and sort by start date. The sort is stable, so
/// equal timestamps keep concatenation order.
pub fn merge_events(
    per_source: Vec<Vec<RawEvent>>,
    fallback: &[RawEvent],
    now: DateTime<Utc>,
    tz: Tz,
) -> MergeOutcome {
    let mut out = MergeOutcome::default();
    let mut seen: HashSet<String> = HashSet::new();

    let all = per_source
        .into_iter()
        .flatten()
        .chain(fallback.iter().cloned());

    for ev in all {
        let title = ev.title.as_deref().map(normalize_text).unwrap_or_default();
        if title.is_empty() {
            out.untitled += 1;
            continue;
        }

        let start_date = match normalize_date(ev.start.as_deref(), tz) {
            Some(ts) => ts,
            None => {
                tracing::debug!(target: "feed", %title, raw = ?ev.start, "unparseable date, using retrieval time");
                out.date_fallbacks += 1;
                now
            }
        };

        if !seen.insert(title.clone()) {
            out.duplicates += 1;
            continue;
        }

        out.events.push(EventRecord {
            title,
            start_date,
            location: ev.location.unwrap_or_default(),
            link: ev.link.unwrap_or_default(),
        });
    }

    out.events.sort_by_key(|e| e.start_date);
    out
}

/// `{"events": [...]}`, two-space indented.
pub fn render_payload(events: &[EventRecord]) -> Result<String> {
    serde_json::to_string_pretty(&FeedPayload { events }).context("serializing events payload")
}

/// Runs every configured source concurrently and merges the results.
pub struct Aggregator {
    transport: Arc<dyn Transport>,
    sources: Vec<SourceDescriptor>,
    fallback: Vec<RawEvent>,
    tz: Tz,
    source_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        transport: Arc<dyn Transport>,
        sources: Vec<SourceDescriptor>,
        fallback: Vec<RawEvent>,
    ) -> Self {
        Self {
            transport,
            sources,
            fallback,
            tz: dates::DEFAULT_TIMEZONE,
            source_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Upper bound on a single source's fetch, on top of the transport's own timeout.
    pub fn with_source_timeout(mut self, cap: Duration) -> Self {
        self.source_timeout = cap;
        self
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// Fetch all sources (fan-out/fan-in) and merge. `now` stands in for any
    /// date that cannot be parsed.
    pub async fn collect(&self, now: DateTime<Utc>) -> Vec<EventRecord> {
        ensure_metrics_described();

        // join_all yields results in input order, whatever finishes first.
        let per_source = futures::future::join_all(
            self.sources
                .iter()
                .map(|s| fetch_source(self.transport.as_ref(), s, self.source_timeout)),
        )
        .await;

        let merged = merge_events(per_source, &self.fallback, now, self.tz);

        counter!("feed_dropped_total").increment((merged.untitled + merged.duplicates) as u64);
        counter!("feed_date_fallback_total").increment(merged.date_fallbacks as u64);
        gauge!("feed_last_refresh_ts").set(now.timestamp() as f64);

        tracing::info!(
            target: "feed",
            kept = merged.events.len(),
            untitled = merged.untitled,
            duplicates = merged.duplicates,
            date_fallbacks = merged.date_fallbacks,
            "aggregation complete"
        );
        merged.events
    }

    /// One full cycle, serialized.
    pub async fn render(&self) -> Result<String> {
        let events = self.collect(Utc::now()).await;
        render_payload(&events)
    }
}
