// src/ingest/fetcher.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use crate::ingest::types::{RawEvent, SourceDescriptor};

pub const DEFAULT_USER_AGENT: &str = "TechEventsFeedBot/1.0 (+https://charlestonhacks.com)";

/// Network boundary for one document retrieval.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| anyhow!("HTTP {}", e.status().map_or(0, |s| s.as_u16())))?;
        resp.text().await.context("reading response body")
    }
}

/// Fetch one source and run its extractor. Every failure is logged and
/// turned into an empty result so the other sources are unaffected.
pub async fn fetch_source(
    transport: &dyn Transport,
    source: &SourceDescriptor,
    cap: Duration,
) -> Vec<RawEvent> {
    let body = match tokio::time::timeout(cap, transport.get_text(&source.url)).await {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => {
            tracing::warn!(target: "feed", source = %source.name, error = %e, "source failed");
            counter!("feed_source_errors_total").increment(1);
            return Vec::new();
        }
        Err(_) => {
            tracing::warn!(
                target: "feed",
                source = %source.name,
                timeout_ms = cap.as_millis() as u64,
                "source timed out"
            );
            counter!("feed_source_errors_total").increment(1);
            return Vec::new();
        }
    };

    let t0 = std::time::Instant::now();
    let events: Vec<RawEvent> = source
        .extractor
        .extract(&body)
        .into_iter()
        .map(|ev| source.complete(ev))
        .collect();
    histogram!("feed_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("feed_source_events_total").increment(events.len() as u64);

    tracing::info!(
        target: "feed",
        source = %source.name,
        kind = source.extractor.kind(),
        count = events.len(),
        "source fetched"
    );
    events
}

// --- Test helper ---
/// Serves canned documents by URL; unknown URLs fail like a 404.
#[derive(Debug, Default, Clone)]
pub struct FixtureTransport {
    pages: HashMap<String, String>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("HTTP 404 for {url}"))
    }
}
