//! Tech Events Feed: binary entrypoint
//! Boots the Axum service on Shuttle: config, shared gateway, refresh timer.

use shuttle_axum::ShuttleAxum;
use tracing::info;

use tech_events_feed::{build_state, service_router, telemetry, FeedConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    tech_events_feed::init_tracing();

    let cfg = FeedConfig::load_default()?;
    let state = build_state(&cfg)?;
    info!(
        sources = cfg.sources.len(),
        fallback = cfg.fallback.len(),
        cache_key = %cfg.cache.key,
        ttl_secs = cfg.cache.ttl_secs,
        "feed configured"
    );

    // Recorder first: the scheduler's first tick fires right away.
    let metrics = if telemetry::route_enabled() {
        Some(telemetry::Metrics::init(cfg.cache_settings().ttl)?)
    } else {
        None
    };

    Ok(service_router(&cfg, state, metrics.as_ref()).into())
}
