// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod ingest;
pub mod telemetry;

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::api::{create_router, AppState};
pub use crate::cache::{CacheGateway, CacheStatus};
pub use crate::config::FeedConfig;
pub use crate::ingest::Aggregator;

use crate::ingest::fetcher::{HttpTransport, Transport};
use crate::ingest::scheduler::spawn_refresh_scheduler;
use crate::telemetry::Metrics;

/// Install the global subscriber: `RUST_LOG`-style filter (default `info`),
/// compact lines, or JSON lines with `FEED_LOG_JSON=1`. A subscriber that is
/// already installed (e.g. by the Shuttle runtime) is left alone.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("FEED_LOG_JSON").ok().as_deref() == Some("1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

pub fn build_aggregator(cfg: &FeedConfig) -> Result<Aggregator> {
    let transport = HttpTransport::new(
        &cfg.http.user_agent,
        Duration::from_secs(cfg.http.timeout_secs),
    )?;
    build_aggregator_with(cfg, Arc::new(transport))
}

/// Same as [`build_aggregator`] but with a caller-supplied transport.
pub fn build_aggregator_with(cfg: &FeedConfig, transport: Arc<dyn Transport>) -> Result<Aggregator> {
    cfg.validate()?;
    Ok(Aggregator::new(transport, cfg.descriptors()?, cfg.fallback_events())
        .with_timezone(cfg.tz()?)
        .with_source_timeout(Duration::from_secs(cfg.http.source_timeout_secs)))
}

pub fn build_state(cfg: &FeedConfig) -> Result<AppState> {
    let aggregator = build_aggregator(cfg)?;
    Ok(state_from(cfg, aggregator))
}

pub fn build_state_with(cfg: &FeedConfig, transport: Arc<dyn Transport>) -> Result<AppState> {
    let aggregator = build_aggregator_with(cfg, transport)?;
    Ok(state_from(cfg, aggregator))
}

fn state_from(cfg: &FeedConfig, aggregator: Aggregator) -> AppState {
    let gateway = CacheGateway::new(
        Arc::new(aggregator),
        cfg.build_store(),
        cfg.cache_settings(),
    );
    AppState {
        gateway: Arc::new(gateway),
    }
}

/// Full service wiring: optional `/metrics` route plus the refresh timer.
/// Takes an already installed recorder so the timer's first (immediate) tick
/// is recorded.
pub fn service_router(cfg: &FeedConfig, state: AppState, metrics: Option<&Metrics>) -> Router {
    if cfg.scheduler.enabled {
        let interval = cfg.refresh_interval();
        tracing::info!(interval_secs = interval.as_secs(), "starting refresh scheduler");
        spawn_refresh_scheduler(state.gateway.clone(), interval);
    }

    let router = create_router(state);
    match metrics {
        Some(m) => router.merge(m.router()),
        None => router,
    }
}

/// Router built from the default config lookup, without the refresh timer.
pub fn app() -> Result<Router> {
    let cfg = FeedConfig::load_default()?;
    Ok(create_router(build_state(&cfg)?))
}
