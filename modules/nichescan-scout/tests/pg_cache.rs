//! Postgres cache store against a live database.
//!
//! Requirements:
//!   - DATABASE_URL env var (Postgres)

use chrono::{Duration, Utc};
use nichescan_common::KeywordStat;
use nichescan_scout::{CacheStore, Payload, PgCacheStore};

async fn store(ttl: Duration) -> Option<PgCacheStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(
        PgCacheStore::connect(&url, ttl)
            .await
            .expect("Failed to connect to Postgres"),
    )
}

fn unique_key(label: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("test_{label}_{nanos}")
}

fn stats() -> Payload {
    Payload::Keywords(vec![
        KeywordStat {
            keyword: "anime".into(),
            result_count: 30,
        },
        KeywordStat {
            keyword: "anime tv".into(),
            result_count: 12,
        },
    ])
}

#[tokio::test]
async fn set_then_get_round_trips_and_upserts() {
    let Some(store) = store(Duration::hours(6)).await else {
        eprintln!("Skipping: DATABASE_URL not set");
        return;
    };
    let key = unique_key("upsert");

    assert!(store.get(&key).await.unwrap().is_none());

    store.set(&key, &stats()).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some(stats()));

    store.set(&key, &Payload::Items(Vec::new())).await.unwrap();
    assert_eq!(store.get(&key).await.unwrap(), Some(Payload::Items(Vec::new())));

    let status = store.status().await.unwrap();
    let entry = status.iter().find(|s| s.key == key).unwrap();
    assert_eq!(entry.kind, "items");
    assert_eq!(entry.entries, 0);
    assert!(entry.fresh);
}
