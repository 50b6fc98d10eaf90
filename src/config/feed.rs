// src/config/feed.rs
//! Feed configuration: cache identity, HTTP client settings, refresh cadence,
//! the source list and the curated fallback events.
//!
//! Lookup order for `load_default()`:
//! 1) `$FEED_CONFIG_PATH` (must exist)
//! 2) `config/feed.toml`
//! 3) `config/feed.json`
//! 4) built-in `default_seed()`

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::cache::{CacheSettings, FileKv, KvStore, MemoryKv};
use crate::ingest::fetcher::DEFAULT_USER_AGENT;
use crate::ingest::providers::{
    blocks::BlockExtractor, cards::CardExtractor, json_api::JsonApiExtractor,
    listing::ListingExtractor,
};
use crate::ingest::types::{Extractor, RawEvent, SourceDescriptor};

pub const ENV_FEED_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const DEFAULT_CACHE_KEY: &str = "tech_events_feed_v1";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3 * 60 * 60;

fn default_timezone() -> String {
    "America/New_York".to_string()
}
fn default_true() -> bool {
    true
}
fn default_cache_key() -> String {
    DEFAULT_CACHE_KEY.to_string()
}
fn default_cache_dir() -> String {
    "cache/feed".to_string()
}
fn default_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_source_timeout_secs() -> u64 {
    15
}
fn default_location() -> String {
    "TBA".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// IANA zone used for dates published without an offset.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub cache: CacheCfg,
    #[serde(default)]
    pub http: HttpCfg,
    #[serde(default)]
    pub scheduler: SchedulerCfg,
    #[serde(default)]
    pub sources: Vec<SourceCfg>,
    #[serde(default)]
    pub fallback: Vec<FallbackEvent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    File,
    /// No store: every request recomputes.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheCfg {
    #[serde(default)]
    pub backend: CacheBackend,
    /// Directory for the `file` backend.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    #[serde(default = "default_cache_key")]
    pub key: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            dir: default_cache_dir(),
            key: default_cache_key(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCfg {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout of the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Hard cap on one source's fetch, enforced around the client.
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            source_timeout_secs: default_source_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to the cache TTL so the feed is re-warmed as it expires.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Listing,
    Cards,
    Blocks,
    JsonApi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCfg {
    pub name: String,
    pub url: String,
    /// Base for relative links; defaults to `url`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Placeholder location for records that carry none.
    #[serde(default = "default_location")]
    pub location: String,
    pub kind: SourceKind,
    /// Block separator (blocks only).
    #[serde(default)]
    pub marker: Option<String>,
    /// Title for blocks without a heading (blocks only).
    #[serde(default)]
    pub default_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEvent {
    pub title: String,
    #[serde(rename = "startDate", alias = "start_date")]
    pub start_date: String,
    pub location: String,
    pub link: String,
}

impl SourceCfg {
    fn extractor(&self) -> Result<Box<dyn Extractor>> {
        let ex: Box<dyn Extractor> = match self.kind {
            SourceKind::Listing => Box::new(ListingExtractor),
            SourceKind::Cards => Box::new(CardExtractor),
            SourceKind::JsonApi => Box::new(JsonApiExtractor),
            SourceKind::Blocks => {
                let marker = self
                    .marker
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .ok_or_else(|| anyhow!("source '{}': blocks kind requires a marker", self.name))?;
                let mut ex = BlockExtractor::new(marker);
                if let Some(t) = self.default_title.as_deref() {
                    ex = ex.with_default_title(t);
                }
                Box::new(ex)
            }
        };
        Ok(ex)
    }

    pub fn to_descriptor(&self) -> Result<SourceDescriptor> {
        let url = Url::parse(&self.url)
            .with_context(|| format!("source '{}': invalid url {}", self.name, self.url))?;
        let base = match self.base_url.as_deref() {
            Some(b) => Url::parse(b)
                .with_context(|| format!("source '{}': invalid base_url {b}", self.name))?,
            None => url.clone(),
        };
        Ok(SourceDescriptor {
            name: self.name.clone(),
            url: self.url.clone(),
            base,
            default_location: self.location.clone(),
            extractor: self.extractor()?,
        })
    }
}

impl FeedConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = Self::parse(&content, &ext)
            .with_context(|| format!("parsing feed config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FEED_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            bail!("{ENV_FEED_CONFIG_PATH} points to non-existent path");
        }
        let toml_p = PathBuf::from("config/feed.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/feed.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default_seed())
    }

    fn parse(s: &str, hint_ext: &str) -> Result<Self> {
        match hint_ext {
            "toml" => Ok(toml::from_str(s)?),
            "json" => Ok(serde_json::from_str(s)?),
            // Unknown extension: sniff.
            _ if s.trim_start().starts_with('{') => Ok(serde_json::from_str(s)?),
            _ => Ok(toml::from_str(s)?),
        }
    }

    /// Fail fast on anything that would otherwise only surface mid-request.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.cache.key.trim().is_empty() {
            bail!("cache.key must not be empty");
        }
        if self.cache.ttl_secs == 0 {
            bail!("cache.ttl_secs must be positive");
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be positive");
        }
        if self.http.source_timeout_secs == 0 {
            bail!("http.source_timeout_secs must be positive");
        }
        for s in &self.sources {
            s.to_descriptor()?;
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("unknown timezone '{}': {e}", self.timezone))
    }

    pub fn descriptors(&self) -> Result<Vec<SourceDescriptor>> {
        self.sources.iter().map(SourceCfg::to_descriptor).collect()
    }

    pub fn fallback_events(&self) -> Vec<RawEvent> {
        self.fallback
            .iter()
            .map(|f| RawEvent {
                title: Some(f.title.clone()),
                start: Some(f.start_date.clone()),
                location: Some(f.location.clone()),
                link: Some(f.link.clone()),
            })
            .collect()
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            key: self.cache.key.clone(),
            ttl: Duration::from_secs(self.cache.ttl_secs),
        }
    }

    /// The configured store, or `None` for the `none` backend.
    pub fn build_store(&self) -> Option<Arc<dyn KvStore>> {
        let store: Arc<dyn KvStore> = match self.cache.backend {
            CacheBackend::Memory => Arc::new(MemoryKv::new()),
            CacheBackend::File => Arc::new(FileKv::new(&self.cache.dir)),
            CacheBackend::None => return None,
        };
        Some(store)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.scheduler
                .interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(self.cache.ttl_secs),
        )
    }

    /// Built-in Charleston seed: three live sources plus curated fallback events.
    pub fn default_seed() -> Self {
        let src = |name: &str, url: &str, kind: SourceKind| SourceCfg {
            name: name.to_string(),
            url: url.to_string(),
            base_url: None,
            location: "Charleston, SC".to_string(),
            kind,
            marker: None,
            default_title: None,
        };
        let fb = |title: &str, start: &str, location: &str, link: &str| FallbackEvent {
            title: title.to_string(),
            start_date: start.to_string(),
            location: location.to_string(),
            link: link.to_string(),
        };

        Self {
            timezone: default_timezone(),
            cache: CacheCfg::default(),
            http: HttpCfg::default(),
            scheduler: SchedulerCfg::default(),
            sources: vec![
                src(
                    "Charleston Digital Corridor",
                    "https://www.charlestondigital.com/events",
                    SourceKind::Listing,
                ),
                src(
                    "Startup Grind Charleston",
                    "https://www.startupgrind.com/charleston/",
                    SourceKind::Cards,
                ),
                SourceCfg {
                    base_url: Some("https://www.meetup.com".to_string()),
                    marker: Some("eventCard--link".to_string()),
                    default_title: Some("Meetup Event".to_string()),
                    ..src(
                        "Charleston Technology Group",
                        "https://www.meetup.com/charleston-technology-group/",
                        SourceKind::Blocks,
                    )
                },
            ],
            fallback: vec![
                fb(
                    "Charleston Tech Happy Hour",
                    "2025-11-15T17:00:00-05:00",
                    "Revelry Brewing",
                    "https://www.linkedin.com/company/charlestonhacks",
                ),
                fb(
                    "HarborHack 2025",
                    "2025-10-03T08:00:00-04:00",
                    "Charleston Tech Center",
                    "https://charlestonhacks.com/hackathon",
                ),
                fb(
                    "Blue Sky Demo Day",
                    "2026-02-14T09:00:00-05:00",
                    "Charleston Digital Corridor",
                    "https://charlestonhacks.com/events",
                ),
            ],
        }
    }
}
