//! One-shot aggregation: fetch every configured source once, skip the cache,
//! print the payload to stdout. Logs go to stderr.
//!
//! Usage: `feed_once [path/to/feed.toml]`

use std::path::PathBuf;

use tech_events_feed::{build_aggregator, FeedConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cfg = match std::env::args().nth(1) {
        Some(p) => FeedConfig::load_from(&PathBuf::from(p))?,
        None => FeedConfig::load_default()?,
    };

    let payload = build_aggregator(&cfg)?.render().await?;
    println!("{payload}");
    Ok(())
}
