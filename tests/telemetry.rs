// tests/telemetry.rs
//
// Prometheus exposition: the recorder is process-global, so everything that
// depends on it lives in this one test binary and shares one install.

use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use once_cell::sync::Lazy;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt as _;

use tech_events_feed::config::FeedConfig;
use tech_events_feed::ingest::fetcher::FixtureTransport;
use tech_events_feed::telemetry::{self, Metrics, ENV_METRICS_ROUTE};
use tech_events_feed::{build_state_with, service_router};

static METRICS: Lazy<Metrics> =
    Lazy::new(|| Metrics::init(Duration::from_secs(10_800)).expect("install recorder"));

async fn scrape(app: Router) -> String {
    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .expect("build GET /metrics");
    let resp = app.oneshot(req).await.expect("oneshot /metrics");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

#[tokio::test]
async fn metrics_route_exposes_feed_series() {
    let m = &*METRICS;

    // every source 404s -> error counter moves
    let cfg = FeedConfig::default_seed();
    let agg = tech_events_feed::build_aggregator_with(&cfg, Arc::new(FixtureTransport::new()))
        .expect("aggregator");
    agg.render().await.expect("render");

    let text = scrape(m.router()).await;
    assert!(text.contains("feed_cache_ttl_secs 10800"), "{text}");
    assert!(text.contains("feed_source_errors_total 3"), "{text}");
    assert!(text.contains("feed_last_refresh_ts"), "{text}");
}

#[tokio::test]
async fn first_scheduled_refresh_is_recorded() {
    let m = &*METRICS;

    // no live sources: this test must not move the source error counter
    let mut cfg = FeedConfig::default_seed();
    cfg.sources.clear();
    cfg.scheduler.enabled = true;
    cfg.scheduler.interval_secs = Some(3600);
    let state =
        build_state_with(&cfg, Arc::new(FixtureTransport::new())).expect("build state");

    let app = service_router(&cfg, state, Some(m));
    // immediate first tick
    tokio::time::sleep(Duration::from_millis(100)).await;

    let text = scrape(app).await;
    assert!(text.contains("feed_refresh_runs_total 1"), "{text}");
    assert!(
        text.contains("# HELP feed_last_refresh_ts"),
        "descriptions registered against the live recorder: {text}"
    );
}

#[test]
#[serial]
fn metrics_route_is_opt_in() {
    std::env::remove_var(ENV_METRICS_ROUTE);
    assert!(!telemetry::route_enabled());

    std::env::set_var(ENV_METRICS_ROUTE, "1");
    assert!(telemetry::route_enabled());

    std::env::set_var(ENV_METRICS_ROUTE, "yes");
    assert!(!telemetry::route_enabled());
    std::env::remove_var(ENV_METRICS_ROUTE);
}
