use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use catalog_client::{BrowserHeaders, CatalogClient, HttpTransport, Transport};
use chrono::Utc;
use nichescan_common::{
    CategoryScore, Comparison, Config, FileConfig, Item, KeywordStat, Locale, NicheScore,
    OpportunityScore, RequestShape, ScoreSubject,
};
use tracing::{debug, info, warn};

use crate::cache::{ttl_from_hours, CacheStatus, CacheStore, MemoryCacheStore, Payload, PgCacheStore};
use crate::cancel::{CancelToken, CancellationRegistry};
use crate::compare;
use crate::endpoints::{EndpointPool, PoolStatus};
use crate::error::{AcquireError, Result};
use crate::pipeline::Pipeline;
use crate::scoring;
use crate::seeds::Seeds;
use crate::throttle::{PacingConfig, RateGate};
use crate::timing::{LogTimingSink, TimingSink};
use crate::transport::RotatingEndpoints;

/// Listing size sampled when scoring a category. Matches the default
/// listing count so both share a cache entry.
pub const CATEGORY_SCORE_SAMPLE: usize = 100;

pub struct ScoutSettings {
    pub base_url: String,
    pub pacing: PacingConfig,
    pub seeds: Seeds,
    pub enrich: bool,
}

/// Boundary of the acquisition core. Every operation runs as the single
/// active task of its group; a newer call in the same group supersedes it.
pub struct Scout {
    pipeline: Pipeline,
    registry: CancellationRegistry,
    pool: Arc<EndpointPool>,
    cache: Arc<dyn CacheStore>,
    timing: Arc<dyn TimingSink>,
}

impl Scout {
    /// Wrap `transport` with browser headers and endpoint rotation over
    /// `pool`, then build the pipeline on top.
    pub fn new<T: Transport + 'static>(
        transport: T,
        pool: Arc<EndpointPool>,
        cache: Arc<dyn CacheStore>,
        settings: ScoutSettings,
    ) -> Self {
        let stack: Arc<dyn Transport> = Arc::new(RotatingEndpoints::new(
            BrowserHeaders::new(transport),
            pool.clone(),
        ));
        let client = CatalogClient::new(stack, &settings.base_url);
        let gate = Arc::new(RateGate::new(settings.pacing));
        let pipeline = Pipeline::new(client, gate, cache.clone(), settings.seeds)
            .with_enrichment(settings.enrich);

        Self {
            pipeline,
            registry: CancellationRegistry::new(),
            pool,
            cache,
            timing: Arc::new(LogTimingSink),
        }
    }

    /// Build from process configuration: reqwest transport, proxies from
    /// `PROXIES`, Postgres cache when `DATABASE_URL` is set.
    pub async fn from_config(config: &Config, file: &FileConfig, enrich: bool) -> anyhow::Result<Self> {
        let ttl = ttl_from_hours(file.cache.ttl_hours);
        let cache: Arc<dyn CacheStore> = match &config.database_url {
            Some(url) => Arc::new(
                PgCacheStore::connect(url, ttl)
                    .await
                    .context("Failed to open Postgres cache")?,
            ),
            None => Arc::new(MemoryCacheStore::new(ttl)),
        };

        let pool = Arc::new(EndpointPool::new(config.proxies.clone()));
        if !config.proxies.is_empty() {
            info!(count = config.proxies.len(), "Rotating through proxies");
        }

        let settings = ScoutSettings {
            base_url: config.catalog_base_url.clone(),
            pacing: PacingConfig::from_settings(&file.pacing),
            seeds: Seeds::builtin().with_custom(file),
            enrich,
        };
        let transport = HttpTransport::new(Duration::from_secs(config.proxy_timeout_secs));

        Ok(Self::new(transport, pool, cache, settings))
    }

    pub fn with_timing_sink(mut self, sink: Arc<dyn TimingSink>) -> Self {
        self.timing = sink;
        self
    }

    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn seeds(&self) -> &Seeds {
        self.pipeline.seeds()
    }

    pub async fn fetch_general_top(&self, count: usize, locale: &Locale) -> Result<Vec<Item>> {
        let shape = RequestShape::GeneralTop { count };
        Ok(self.fetch_in("top", shape, locale).await?.into_items())
    }

    /// Unknown categories yield an empty list.
    pub async fn fetch_category_top(
        &self,
        name: &str,
        count: usize,
        locale: &Locale,
    ) -> Result<Vec<Item>> {
        let shape = RequestShape::Category {
            name: name.to_string(),
            count,
        };
        Ok(self.fetch_in("category", shape, locale).await?.into_items())
    }

    /// Keywords ranked by probe result count. Unknown niches yield an empty list.
    pub async fn fetch_niche_keywords(
        &self,
        niche: &str,
        locale: &Locale,
    ) -> Result<Vec<KeywordStat>> {
        let shape = RequestShape::NicheKeywords {
            niche: niche.to_string(),
        };
        Ok(self.fetch_in("niche", shape, locale).await?.into_keywords())
    }

    async fn fetch_in(&self, group: &str, shape: RequestShape, locale: &Locale) -> Result<Payload> {
        let task = self.registry.enter(group);
        let started = Instant::now();
        let fetched = self.pipeline.fetch(&shape, locale, task.token()).await?;
        self.timing
            .record(&shape.endpoint_name(), started.elapsed(), fetched.from_cache);
        Ok(fetched.payload)
    }

    pub async fn app_details(&self, app_id: &str, locale: &Locale) -> Result<Item> {
        let task = self.registry.enter("details");
        let started = Instant::now();
        let item = self.pipeline.details(app_id, locale, task.token()).await?;
        self.timing.record("details", started.elapsed(), false);
        Ok(item)
    }

    pub async fn compare_items(&self, a: &str, b: &str, locale: &Locale) -> Result<Comparison> {
        let task = self.registry.enter("compare");
        let token = task.token();
        let started = Instant::now();
        let (item_a, item_b) = futures::try_join!(
            self.pipeline.details(a, locale, token),
            self.pipeline.details(b, locale, token),
        )?;
        self.timing.record("compare", started.elapsed(), false);
        Ok(compare::compare(&item_a, &item_b))
    }

    pub async fn score(
        &self,
        subject: &ScoreSubject,
        locale: &Locale,
    ) -> Result<Option<OpportunityScore>> {
        Ok(match subject {
            ScoreSubject::Niche(niche) => self
                .score_niche(niche, locale)
                .await?
                .map(OpportunityScore::Niche),
            ScoreSubject::Category(name) => self
                .score_category(name, locale)
                .await?
                .map(OpportunityScore::Category),
        })
    }

    /// `None` for unknown niches, before any network access.
    pub async fn score_niche(&self, niche: &str, locale: &Locale) -> Result<Option<NicheScore>> {
        let task = self.registry.enter("niche-score");
        let started = Instant::now();
        let score = self.niche_score_with(niche, locale, task.token()).await?;
        self.timing
            .record(&format!("niche/{niche}/score"), started.elapsed(), false);
        Ok(score)
    }

    /// Score every known niche, best first. Niches that fail transiently are
    /// left out; a block or cancellation stops the sweep.
    pub async fn score_all_niches(&self, locale: &Locale) -> Result<Vec<NicheScore>> {
        let task = self.registry.enter("niche-scores");
        let started = Instant::now();
        let niches: Vec<String> = self.seeds().niches().map(String::from).collect();

        let mut scores = Vec::with_capacity(niches.len());
        for niche in &niches {
            match self.niche_score_with(niche, locale, task.token()).await {
                Ok(Some(score)) => scores.push(score),
                Ok(None) => debug!(niche = %niche, "Not enough data to score niche"),
                Err(e @ AcquireError::Transient(_)) => {
                    warn!(niche = %niche, error = %e, "Skipping niche")
                }
                Err(e) => return Err(e),
            }
        }
        scores.sort_by(|a, b| b.opportunity_score.total_cmp(&a.opportunity_score));

        self.timing.record("niche-scores", started.elapsed(), false);
        Ok(scores)
    }

    async fn niche_score_with(
        &self,
        niche: &str,
        locale: &Locale,
        token: &CancelToken,
    ) -> Result<Option<NicheScore>> {
        if self.seeds().niche_keywords(niche).is_empty() {
            debug!(niche = %niche, "Unknown niche, not scoring");
            return Ok(None);
        }
        let shape = RequestShape::NicheKeywords {
            niche: niche.to_string(),
        };
        let keywords = self
            .pipeline
            .fetch(&shape, locale, token)
            .await?
            .payload
            .into_keywords();
        token.check()?;

        let sample = self.pipeline.sample_for_niche(niche, locale, token).await?;
        Ok(scoring::score_niche(
            niche,
            &keywords,
            &sample,
            Utc::now().date_naive(),
        ))
    }

    /// Score a category's top listing. `None` when the sample is too small
    /// or unrated.
    pub async fn score_category(&self, name: &str, locale: &Locale) -> Result<Option<CategoryScore>> {
        let task = self.registry.enter("category-score");
        let started = Instant::now();
        let shape = RequestShape::Category {
            name: name.to_string(),
            count: CATEGORY_SCORE_SAMPLE,
        };
        let fetched = self.pipeline.fetch(&shape, locale, task.token()).await?;
        self.timing.record(
            &format!("category/{name}/score"),
            started.elapsed(),
            fetched.from_cache,
        );
        Ok(scoring::score_category(name, &fetched.payload.into_items()))
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    pub async fn cache_status(&self) -> Result<Vec<CacheStatus>> {
        Ok(self.cache.status().await?)
    }
}
