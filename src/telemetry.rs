//! Prometheus exposition for the feed counters recorded in `ingest` and `cache`.
//!
//! Every path serves the feed by default, so `/metrics` is only mounted when
//! `FEED_METRICS_ROUTE=1`.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub const ENV_METRICS_ROUTE: &str = "FEED_METRICS_ROUTE";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the configured cache TTL.
    pub fn init(cache_ttl: Duration) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("feed_cache_ttl_secs").set(cache_ttl.as_secs() as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub fn route_enabled() -> bool {
    std::env::var(ENV_METRICS_ROUTE)
        .ok()
        .is_some_and(|v| v.trim() == "1")
}
