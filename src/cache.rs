//! Read-through cache in front of the aggregator.
//!
//! The store owns expiry: the gateway writes with a TTL and otherwise trusts
//! whatever `get` returns. No freshness state lives in-process, so a restart
//! can never resurrect a payload the store has already expired.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

use crate::ingest::Aggregator;

/// Key-value boundary. `put` carries the TTL; the store enforces it.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// In-process store. Good for a single instance; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| anyhow!("memory kv mutex poisoned"))?;
        match map.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Ok(Some(value.clone())),
            Some(_) => {
                map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| anyhow!("memory kv mutex poisoned"))?;
        map.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }
}

/// One JSON file per key, written via tmp + rename. Survives restarts.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

#[derive(Serialize, Deserialize)]
struct FileEntry {
    expires_at_unix: u64,
    value: String,
}

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let entry: FileEntry = serde_json::from_str(&raw)
            .with_context(|| format!("decoding cache entry {}", path.display()))?;
        if now_unix() >= entry.expires_at_unix {
            let _ = tokio::fs::remove_file(&path).await; // best-effort
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let entry = FileEntry {
            expires_at_unix: now_unix().saturating_add(ttl.as_secs()),
            value: value.to_string(),
        };
        let json = serde_json::to_vec(&entry)?;
        write_atomic(&self.path_for(key), &json).await
    }
}

/// Cache identity, passed in at construction so several feeds can share a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub key: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// No store configured, or the store failed this cycle.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: String,
    pub status: CacheStatus,
}

pub struct CacheGateway {
    aggregator: Arc<Aggregator>,
    store: Option<Arc<dyn KvStore>>,
    settings: CacheSettings,
}

impl CacheGateway {
    pub fn new(
        aggregator: Arc<Aggregator>,
        store: Option<Arc<dyn KvStore>>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            aggregator,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Serve the stored payload verbatim, or aggregate, store and return.
    pub async fn get_or_refresh(&self) -> Result<Fetched> {
        let Some(store) = self.store.as_deref() else {
            return self.bypass().await;
        };

        match store.get(&self.settings.key).await {
            Ok(Some(payload)) => {
                counter!("feed_cache_hits_total").increment(1);
                tracing::debug!(target: "cache", key = %self.settings.key, "cache hit");
                return Ok(Fetched {
                    payload,
                    status: CacheStatus::Hit,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "cache", error = %e, "cache read failed, bypassing store");
                counter!("feed_cache_errors_total").increment(1);
                return self.bypass().await;
            }
        }

        counter!("feed_cache_misses_total").increment(1);
        let payload = self.aggregator.render().await?;
        self.store_payload(store, &payload).await;
        Ok(Fetched {
            payload,
            status: CacheStatus::Miss,
        })
    }

    /// Recompute unconditionally and overwrite the entry (last writer wins).
    pub async fn refresh(&self) -> Result<Fetched> {
        let payload = self.aggregator.render().await?;
        let status = match self.store.as_deref() {
            Some(store) => {
                self.store_payload(store, &payload).await;
                CacheStatus::Miss
            }
            None => CacheStatus::Bypass,
        };
        Ok(Fetched { payload, status })
    }

    async fn bypass(&self) -> Result<Fetched> {
        let payload = self.aggregator.render().await?;
        Ok(Fetched {
            payload,
            status: CacheStatus::Bypass,
        })
    }

    async fn store_payload(&self, store: &dyn KvStore, payload: &str) {
        if let Err(e) = store
            .put(&self.settings.key, payload, self.settings.ttl)
            .await
        {
            tracing::warn!(target: "cache", error = %e, "cache write failed");
            counter!("feed_cache_errors_total").increment(1);
        }
    }
}
