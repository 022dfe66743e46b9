// Postgres-backed cache store. One row per logical key.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use super::{CacheEntry, CacheError, CacheStatus, CacheStore, Payload};

pub struct PgCacheStore {
    pool: PgPool,
    ttl: Duration,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CacheRow {
    cache_key: String,
    payload: serde_json::Value,
    fetched_at: DateTime<Utc>,
}

impl CacheRow {
    fn into_entry(self) -> Result<(String, CacheEntry), CacheError> {
        let payload: Payload = serde_json::from_value(self.payload)?;
        Ok((
            self.cache_key,
            CacheEntry {
                payload,
                fetched_at: self.fetched_at,
            },
        ))
    }
}

impl PgCacheStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub async fn connect(database_url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let pool = PgPool::connect(database_url).await?;
        let store = Self::new(pool, ttl);
        store.migrate().await?;
        Ok(store)
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), CacheError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CacheError::Database(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Payload>, CacheError> {
        let row = sqlx::query_as::<_, CacheRow>(
            "SELECT cache_key, payload, fetched_at FROM cache_entries WHERE cache_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let (_, entry) = row.into_entry()?;
        if entry.is_fresh(Utc::now(), self.ttl) {
            Ok(Some(entry.payload))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, payload: &Payload) -> Result<(), CacheError> {
        let json = serde_json::to_value(payload)?;
        sqlx::query(
            "INSERT INTO cache_entries (cache_key, kind, payload, fetched_at)
             VALUES ($1, $2, $3, now())
             ON CONFLICT (cache_key)
             DO UPDATE SET kind = EXCLUDED.kind,
                          payload = EXCLUDED.payload,
                          fetched_at = EXCLUDED.fetched_at",
        )
        .bind(key)
        .bind(payload.kind())
        .bind(json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn status(&self) -> Result<Vec<CacheStatus>, CacheError> {
        let rows = sqlx::query_as::<_, CacheRow>(
            "SELECT cache_key, payload, fetched_at FROM cache_entries ORDER BY fetched_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        rows.into_iter()
            .map(|row| {
                let (key, entry) = row.into_entry()?;
                Ok(CacheStatus::describe(&key, &entry, now, self.ttl))
            })
            .collect()
    }
}
