use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{CacheEntry, CacheError, CacheStatus, CacheStore, Payload};

/// Process-local cache store. Used when no database is configured and in
/// tests, where the `_at` variants pin the clock.
pub struct MemoryCacheStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Payload> {
        self.lock()
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.payload.clone())
    }

    pub fn set_at(&self, key: &str, payload: Payload, fetched_at: DateTime<Utc>) {
        self.lock().insert(
            key.to_string(),
            CacheEntry {
                payload,
                fetched_at,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Payload>, CacheError> {
        Ok(self.get_at(key, Utc::now()))
    }

    async fn set(&self, key: &str, payload: &Payload) -> Result<(), CacheError> {
        self.set_at(key, payload.clone(), Utc::now());
        Ok(())
    }

    async fn status(&self) -> Result<Vec<CacheStatus>, CacheError> {
        let now = Utc::now();
        let mut rows: Vec<CacheStatus> = self
            .lock()
            .iter()
            .map(|(key, entry)| CacheStatus::describe(key, entry, now, self.ttl))
            .collect();
        rows.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nichescan_common::KeywordStat;

    fn stats(n: u32) -> Payload {
        Payload::Keywords(vec![KeywordStat {
            keyword: "k".into(),
            result_count: n,
        }])
    }

    #[test]
    fn hit_before_ttl_miss_after() {
        let store = MemoryCacheStore::new(Duration::hours(6));
        let t0 = Utc::now();
        store.set_at("niche_kw_Anime_us_en", stats(30), t0);

        let eps = Duration::seconds(1);
        assert!(store
            .get_at("niche_kw_Anime_us_en", t0 + Duration::hours(6) - eps)
            .is_some());
        assert!(store
            .get_at("niche_kw_Anime_us_en", t0 + Duration::hours(6) + eps)
            .is_none());
        assert!(store.contains("niche_kw_Anime_us_en"), "stale data stays stored");
    }

    #[test]
    fn set_replaces_whole_entry() {
        let store = MemoryCacheStore::new(Duration::hours(6));
        let t0 = Utc::now();
        store.set_at("k", stats(1), t0);
        store.set_at("k", stats(2), t0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_at("k", t0), Some(stats(2)));
    }

    #[tokio::test]
    async fn status_reports_age_and_freshness() {
        let store = MemoryCacheStore::new(Duration::hours(6));
        store.set_at("old", stats(1), Utc::now() - Duration::hours(7));
        store.set("new", &stats(2)).await.unwrap();

        let status = store.status().await.unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].key, "new");
        assert!(status[0].fresh);
        assert_eq!(status[1].key, "old");
        assert!(!status[1].fresh);
        assert!(status[1].age_minutes >= 7 * 60);
    }
}
