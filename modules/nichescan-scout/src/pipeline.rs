//! Acquisition pipeline: cache probe, paced query fan-out, dedupe, ranking,
//! optional enrichment and cache write-back.

use std::collections::HashSet;
use std::sync::Arc;

use catalog_client::{CatalogApp, CatalogClient, Transport};
use nichescan_common::{Item, KeywordStat, Locale, RequestShape};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, Payload};
use crate::cancel::CancelToken;
use crate::error::{classify, AcquireError, Result};
use crate::seeds::Seeds;
use crate::throttle::RateGate;

/// Hits requested per keyword probe. The result count is the demand signal.
pub const KEYWORD_PROBE_SIZE: u32 = 30;
/// Items sampled when scoring a niche.
pub const NICHE_SAMPLE_SIZE: usize = 30;
/// Keywords searched to build a niche sample when no category matches.
const NICHE_SAMPLE_KEYWORDS: usize = 5;
const SUMMARY_CHARS: usize = 200;

/// A payload and where it came from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: Payload,
    pub from_cache: bool,
}

pub struct Pipeline {
    client: CatalogClient<Arc<dyn Transport>>,
    gate: Arc<RateGate>,
    cache: Arc<dyn CacheStore>,
    seeds: Seeds,
    enrich: bool,
}

impl Pipeline {
    pub fn new(
        client: CatalogClient<Arc<dyn Transport>>,
        gate: Arc<RateGate>,
        cache: Arc<dyn CacheStore>,
        seeds: Seeds,
    ) -> Self {
        Self {
            client,
            gate,
            cache,
            seeds,
            enrich: false,
        }
    }

    /// Fetch full detail records for every listed item before caching.
    pub fn with_enrichment(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }

    pub fn seeds(&self) -> &Seeds {
        &self.seeds
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Serve `shape` from cache or acquire it from the catalog.
    ///
    /// Unknown categories and niches produce an empty payload without any
    /// network access or cache write.
    pub async fn fetch(
        &self,
        shape: &RequestShape,
        locale: &Locale,
        token: &CancelToken,
    ) -> Result<Fetched> {
        let key = shape.cache_key(locale);
        if let Some(payload) = self.cache.get(&key).await? {
            if payload.answers(shape) {
                info!(cache_key = %key, entries = payload.len(), "Serving from cache");
                return Ok(Fetched {
                    payload,
                    from_cache: true,
                });
            }
            warn!(cache_key = %key, kind = payload.kind(), "Cached payload has wrong kind, refetching");
        }

        let payload = match shape {
            RequestShape::GeneralTop { count } => {
                let queries = self.seeds.general_queries().to_vec();
                Payload::Items(self.acquire_listing(queries, *count, locale, token).await?)
            }
            RequestShape::Category { name, count } => {
                let queries = self.seeds.category_queries(name).to_vec();
                if queries.is_empty() {
                    debug!(category = %name, "Unknown category");
                    return Ok(empty(Payload::Items(Vec::new())));
                }
                Payload::Items(self.acquire_listing(queries, *count, locale, token).await?)
            }
            RequestShape::NicheKeywords { niche } => {
                let keywords = self.seeds.niche_keywords(niche).to_vec();
                if keywords.is_empty() {
                    debug!(niche = %niche, "Unknown niche");
                    return Ok(empty(Payload::Keywords(Vec::new())));
                }
                Payload::Keywords(self.acquire_keywords(keywords, locale, token).await?)
            }
        };

        // A burst cut short must never reach the store.
        token.check()?;
        self.cache.set(&key, &payload).await?;
        info!(cache_key = %key, entries = payload.len(), "Cached acquisition");

        Ok(Fetched {
            payload,
            from_cache: false,
        })
    }

    async fn acquire_listing(
        &self,
        mut queries: Vec<String>,
        count: usize,
        locale: &Locale,
        token: &CancelToken,
    ) -> Result<Vec<Item>> {
        self.gate.cooldown(token).await?;
        queries.shuffle(&mut rand::rng());

        let n_hits = u32::try_from(count).unwrap_or(u32::MAX);
        let mut raw = Vec::new();
        let mut failed = 0;
        for query in &queries {
            token.check()?;
            match self.search(query, n_hits, locale, token).await {
                Ok(items) => raw.extend(items),
                Err(e) if e.is_skippable() => {
                    warn!(query = %query, error = %e, "Search failed, skipping query");
                    failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        if !queries.is_empty() && failed == queries.len() {
            return Err(AcquireError::Transient(format!(
                "all {failed} listing queries failed"
            )));
        }

        let items = rank(raw, count);
        if self.enrich {
            return self.enrich_items(items, locale, token).await;
        }
        Ok(items)
    }

    async fn acquire_keywords(
        &self,
        mut keywords: Vec<String>,
        locale: &Locale,
        token: &CancelToken,
    ) -> Result<Vec<KeywordStat>> {
        self.gate.cooldown(token).await?;
        keywords.shuffle(&mut rand::rng());

        let mut stats = Vec::with_capacity(keywords.len());
        let mut failed = 0;
        for keyword in keywords {
            token.check()?;
            let result_count = match self.search(&keyword, KEYWORD_PROBE_SIZE, locale, token).await {
                Ok(results) => results.len() as u32,
                Err(e) if e.is_skippable() => {
                    warn!(keyword = %keyword, error = %e, "Keyword probe failed, recording 0");
                    failed += 1;
                    0
                }
                Err(e) => return Err(e),
            };
            stats.push(KeywordStat {
                keyword,
                result_count,
            });
        }
        if !stats.is_empty() && failed == stats.len() {
            return Err(AcquireError::Transient(format!(
                "all {failed} keyword probes failed"
            )));
        }

        stats.sort_by(|a, b| b.result_count.cmp(&a.result_count));
        Ok(stats)
    }

    /// Replace each item with its detail record. Items whose lookup fails
    /// transiently or goes missing keep their listing record.
    async fn enrich_items(
        &self,
        items: Vec<Item>,
        locale: &Locale,
        token: &CancelToken,
    ) -> Result<Vec<Item>> {
        let mut enriched = Vec::with_capacity(items.len());
        for item in items {
            token.check()?;
            match self.details(&item.app_id, locale, token).await {
                Ok(detailed) => enriched.push(detailed),
                Err(e) if e.is_skippable() => {
                    warn!(app_id = %item.app_id, error = %e, "Enrichment failed, keeping listing record");
                    enriched.push(item);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(enriched)
    }

    /// Items to score a niche against: the top of its matching category, or
    /// a pool of up to 30 unique items from its first few keywords.
    pub async fn sample_for_niche(
        &self,
        niche: &str,
        locale: &Locale,
        token: &CancelToken,
    ) -> Result<Vec<Item>> {
        if let Some(category) = self.seeds.match_category(niche) {
            debug!(niche, category, "Sampling niche from matching category");
            let shape = RequestShape::Category {
                name: category.to_string(),
                count: NICHE_SAMPLE_SIZE,
            };
            return Ok(self.fetch(&shape, locale, token).await?.payload.into_items());
        }

        let keywords: Vec<String> = self
            .seeds
            .niche_keywords(niche)
            .iter()
            .take(NICHE_SAMPLE_KEYWORDS)
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        let mut pool = Vec::new();
        for keyword in &keywords {
            token.check()?;
            let results = match self.search(keyword, KEYWORD_PROBE_SIZE, locale, token).await {
                Ok(results) => results,
                Err(e) if e.is_skippable() => {
                    warn!(keyword = %keyword, error = %e, "Sample search failed");
                    continue;
                }
                Err(e) => return Err(e),
            };
            pool.extend(
                results
                    .into_iter()
                    .filter(|item| !item.app_id.is_empty() && seen.insert(item.app_id.clone())),
            );
            if pool.len() >= NICHE_SAMPLE_SIZE {
                break;
            }
        }
        pool.truncate(NICHE_SAMPLE_SIZE);

        info!(niche, apps = pool.len(), "Gathered niche sample from keyword search");
        Ok(pool)
    }

    /// One paced search. Results come back normalized.
    pub async fn search(
        &self,
        query: &str,
        n_hits: u32,
        locale: &Locale,
        token: &CancelToken,
    ) -> Result<Vec<Item>> {
        self.gate.acquire(token).await?;
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AcquireError::Cancelled),
            r = self.client.search(query, &locale.lang, &locale.country, n_hits) => r,
        };
        let apps = self.settle(result)?;
        Ok(apps.into_iter().map(to_item).collect())
    }

    /// One paced detail lookup.
    pub async fn details(&self, app_id: &str, locale: &Locale, token: &CancelToken) -> Result<Item> {
        self.gate.acquire(token).await?;
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AcquireError::Cancelled),
            r = self.client.details(app_id, &locale.lang, &locale.country) => r,
        };
        self.settle(result).map(to_item)
    }

    /// Classify the outcome and feed the gate's error counter.
    fn settle<V>(&self, result: catalog_client::Result<V>) -> Result<V> {
        match result {
            Ok(value) => {
                self.gate.record_success();
                Ok(value)
            }
            Err(e) => {
                let err = classify(e);
                if err.counts_against_pacing() {
                    self.gate.record_failure();
                }
                if let AcquireError::Blocked(reason) = &err {
                    warn!(reason = %reason, "Catalog is blocking requests");
                }
                Err(err)
            }
        }
    }
}

fn empty(payload: Payload) -> Fetched {
    Fetched {
        payload,
        from_cache: false,
    }
}

/// Remove repeated identities, keeping the first occurrence.
pub fn dedupe(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| !item.app_id.is_empty() && seen.insert(item.app_id.clone()))
        .collect()
}

/// Dedupe, normalize installs, sort by installs descending, truncate.
pub fn rank(items: Vec<Item>, count: usize) -> Vec<Item> {
    let mut items = dedupe(items);
    for item in &mut items {
        item.ensure_installs();
    }
    items.sort_by(|a, b| b.install_count().cmp(&a.install_count()));
    items.truncate(count);
    items
}

pub fn to_item(app: CatalogApp) -> Item {
    let mut item = Item {
        app_id: app.app_id,
        title: app.title,
        developer: app.developer,
        installs: app.installs,
        real_installs: app.real_installs,
        score: app.score,
        genre: app.genre,
        free: app.free,
        price: app.price,
        released: app.released.filter(|r| !r.is_empty()),
        content_rating: app.content_rating,
        icon: app.icon,
        summary: app
            .summary
            .unwrap_or_default()
            .chars()
            .take(SUMMARY_CHARS)
            .collect(),
        description: app.description.unwrap_or_default(),
        ratings: app.ratings,
        reviews: app.reviews,
    };
    item.ensure_installs();
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, installs: &str) -> Item {
        to_item(CatalogApp {
            app_id: id.into(),
            installs: installs.into(),
            ..CatalogApp::default()
        })
    }

    #[test]
    fn dedupe_keeps_first_seen_order() {
        let items = vec![
            item("a", "1+"),
            item("b", "2+"),
            item("a", "3+"),
            item("c", "4+"),
            item("b", "5+"),
        ];
        let ids: Vec<String> = dedupe(items).into_iter().map(|i| i.app_id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn dedupe_drops_items_without_identity() {
        let items = vec![item("", "1+"), item("a", "1+"), item("", "2+")];
        assert_eq!(dedupe(items).len(), 1);
    }

    #[test]
    fn rank_sorts_by_installs_then_truncates() {
        let items = vec![
            item("small", "1,000+"),
            item("big", "10,000,000+"),
            item("small", "999,999,999+"),
            item("mid", "500,000+"),
        ];
        let ranked = rank(items, 2);
        let ids: Vec<&str> = ranked.iter().map(|i| i.app_id.as_str()).collect();
        assert_eq!(ids, ["big", "mid"]);
        assert!(ranked.iter().all(|i| i.real_installs.is_some()));
    }

    #[test]
    fn to_item_truncates_summary_and_fills_installs() {
        let app = CatalogApp {
            app_id: "a".into(),
            installs: "50,000+".into(),
            summary: Some("é".repeat(300)),
            released: Some(String::new()),
            ..CatalogApp::default()
        };
        let item = to_item(app);
        assert_eq!(item.summary.chars().count(), 200);
        assert_eq!(item.real_installs, Some(50_000));
        assert!(item.released.is_none());
    }

    #[test]
    fn to_item_prefers_reported_install_count() {
        let app = CatalogApp {
            app_id: "a".into(),
            installs: "1,000,000+".into(),
            real_installs: Some(1_734_512),
            ..CatalogApp::default()
        };
        assert_eq!(to_item(app).install_count(), 1_734_512);
    }
}
