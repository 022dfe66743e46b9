//! Freshness-bounded storage for acquired payloads.
//!
//! One entry per logical key. Writes replace the whole entry; an entry is
//! served only while `now - fetched_at < ttl`.

mod memory;
mod postgres;

pub use memory::MemoryCacheStore;
pub use postgres::PgCacheStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use nichescan_common::{Item, KeywordStat, RequestShape};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The two payload kinds an acquisition produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Items(Vec<Item>),
    Keywords(Vec<KeywordStat>),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Items(_) => "items",
            Payload::Keywords(_) => "keywords",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Items(v) => v.len(),
            Payload::Keywords(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this payload is what `shape` produces.
    pub fn answers(&self, shape: &RequestShape) -> bool {
        matches!(
            (self, shape),
            (Payload::Keywords(_), RequestShape::NicheKeywords { .. })
                | (
                    Payload::Items(_),
                    RequestShape::GeneralTop { .. } | RequestShape::Category { .. }
                )
        )
    }

    pub fn into_items(self) -> Vec<Item> {
        match self {
            Payload::Items(items) => items,
            Payload::Keywords(_) => Vec::new(),
        }
    }

    pub fn into_keywords(self) -> Vec<KeywordStat> {
        match self {
            Payload::Keywords(stats) => stats,
            Payload::Items(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub payload: Payload,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Strictly younger than `ttl`. An entry exactly `ttl` old is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub key: String,
    pub kind: String,
    pub entries: usize,
    pub fetched_at: DateTime<Utc>,
    pub age_minutes: i64,
    pub fresh: bool,
}

impl CacheStatus {
    fn describe(key: &str, entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key: key.to_string(),
            kind: entry.payload.kind().to_string(),
            entries: entry.payload.len(),
            fetched_at: entry.fetched_at,
            age_minutes: (now - entry.fetched_at).num_minutes(),
            fresh: entry.is_fresh(now, ttl),
        }
    }
}

/// Convert `[cache] ttl_hours` into a duration.
pub fn ttl_from_hours(hours: f64) -> Duration {
    Duration::milliseconds((hours.max(0.0) * 3_600_000.0) as i64)
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The payload under `key` if it is still fresh.
    async fn get(&self, key: &str) -> Result<Option<Payload>, CacheError>;

    /// Replace everything stored under `key`.
    async fn set(&self, key: &str, payload: &Payload) -> Result<(), CacheError>;

    /// One line per stored key, fresh or not, newest first.
    async fn status(&self) -> Result<Vec<CacheStatus>, CacheError>;
}
