// src/ingest/scheduler.rs
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cache::CacheGateway;

/// Scheduled entry point: rebuild the feed and overwrite the cache entry.
/// The payload itself is discarded.
pub async fn run_scheduled_refresh(gateway: &CacheGateway) {
    counter!("feed_refresh_runs_total").increment(1);
    match gateway.refresh().await {
        Ok(fetched) => tracing::info!(
            target: "feed",
            bytes = fetched.payload.len(),
            cache = fetched.status.as_str(),
            "scheduled refresh done"
        ),
        Err(e) => {
            counter!("feed_refresh_errors_total").increment(1);
            tracing::error!(target: "feed", error = ?e, "scheduled refresh failed");
        }
    }
}

/// Spawn the refresh timer. The first tick fires immediately, so the cache is
/// warm right after startup.
pub fn spawn_refresh_scheduler(gateway: Arc<CacheGateway>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_scheduled_refresh(&gateway).await;
        }
    })
}
