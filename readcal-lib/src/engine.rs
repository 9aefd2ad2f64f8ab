//! Reconciliation facade.
//!
//! [`Engine::resolve`] is the one path by which works, chapters and volumes
//! enter the store: cache first, then the source adapter, then estimation
//! and synthesis when the source has no usable chapter list.

use std::sync::Arc;

use futures::future::join_all;
use readcal_core::{
    Chapter, ChapterCountEstimate, Clock, ProviderError, SystemClock, Volume, Work, WorkRef,
};
use readcal_db::Store;
use readcal_providers::{MetadataProvider, ProviderRegistry, with_retries};
use serde::{Deserialize, Serialize};

use crate::cache::{self, CacheEntry, CacheKey, CacheStore, DbCache, Lookup};
use crate::error::EngineError;
use crate::estimator::{ChapterCountEstimator, EstimatorConfig, volumes_for};
use crate::schedule::{synthesize_chapters, synthesize_volumes};
use crate::settings::Settings;

/// Cache type for fully reconciled works.
pub const RESOLVED_KIND: &str = "resolved";

/// A reconciled work with its chapters and volumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    pub work: Work,
    pub chapters: Vec<Chapter>,
    pub volumes: Vec<Volume>,
    /// The count behind synthesized chapters, if synthesis ran.
    #[serde(default)]
    pub estimate: Option<ChapterCountEstimate>,
    /// Built from a stale cache entry because the source was unreachable.
    #[serde(skip)]
    pub degraded: bool,
}

pub struct Engine {
    registry: ProviderRegistry,
    reconciler: Arc<Reconciler>,
}

/// Everything a fetch needs once it leaves the caller's task.
struct Reconciler {
    cache: Arc<dyn CacheStore>,
    store: Arc<Store>,
    estimator: ChapterCountEstimator,
    clock: Arc<dyn Clock>,
    cache_ttl: chrono::Duration,
}

impl Engine {
    /// The estimator races the registry's enabled count providers.
    pub fn new(
        registry: ProviderRegistry,
        cache: Arc<dyn CacheStore>,
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        config: EstimatorConfig,
    ) -> Self {
        let cache_ttl = config.cache_ttl;
        let estimator = ChapterCountEstimator::new(
            registry.count_providers(),
            cache.clone(),
            clock.clone(),
            config,
        );
        Self {
            registry,
            reconciler: Arc::new(Reconciler {
                cache,
                store,
                estimator,
                clock,
                cache_ttl,
            }),
        }
    }

    /// Open the configured database and wire up the built-in providers.
    pub fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        let store = Arc::new(Store::open(&settings.database_path())?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache: Arc<dyn CacheStore> = Arc::new(DbCache::new(store.clone(), clock.clone()));

        let mut registry = ProviderRegistry::with_defaults()?;
        registry.apply_enabled(&settings.provider_flags());

        let config = EstimatorConfig {
            concurrency: settings.race_workers(),
            provider_timeout: settings.provider_timeout(),
            cache_ttl: settings.cache_ttl(),
            ..EstimatorConfig::default()
        };
        Ok(Self::new(registry, cache, store, clock, config))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.reconciler.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.reconciler.clock
    }

    fn provider(&self, source: &str) -> Result<Arc<dyn MetadataProvider>, EngineError> {
        self.registry
            .get(source)
            .ok_or_else(|| EngineError::UnknownProvider(source.to_string()))
    }

    /// Search one source, or every enabled source when `source` is `None`.
    ///
    /// In fan-out mode a failing source contributes nothing and is logged.
    pub async fn search(&self, query: &str, source: Option<&str>) -> Result<Vec<Work>, EngineError> {
        if let Some(name) = source {
            let provider = self.provider(name)?;
            let label = format!("{name} search");
            return Ok(with_retries(&label, || provider.search(query)).await?);
        }

        let providers = self.registry.enabled();
        let results = join_all(providers.iter().map(|p| async move {
            let label = format!("{} search", p.name());
            (p.name(), with_retries(&label, || p.search(query)).await)
        }))
        .await;
        Ok(flatten_fan_out(results, "search"))
    }

    /// Recently updated works from one source, or all enabled sources.
    pub async fn latest(&self, source: Option<&str>) -> Result<Vec<Work>, EngineError> {
        if let Some(name) = source {
            let provider = self.provider(name)?;
            let label = format!("{name} latest");
            return Ok(with_retries(&label, || provider.fetch_latest()).await?);
        }

        let providers = self.registry.enabled();
        let results = join_all(providers.iter().map(|p| async move {
            let label = format!("{} latest", p.name());
            (p.name(), with_retries(&label, || p.fetch_latest()).await)
        }))
        .await;
        Ok(flatten_fan_out(results, "latest"))
    }

    /// Reconcile one work from `source`.
    ///
    /// A fresh cache entry is returned as-is unless `force_refresh` is set.
    /// Otherwise the source is queried and the result is persisted and
    /// written through to the cache. When the source is unavailable, any
    /// cached payload (fresh or expired) is returned with `degraded` set.
    ///
    /// The fetch and write-through run as a separate task: dropping the
    /// returned future stops the wait, not the work.
    pub async fn resolve(
        &self,
        source: &str,
        source_id: &str,
        force_refresh: bool,
    ) -> Result<Resolved, EngineError> {
        let provider = self.provider(source)?;
        let key = CacheKey::new(source, RESOLVED_KIND, source_id);

        let lookup_key = key.clone();
        let lookup = cache::blocking(&self.reconciler.cache, move |c| c.lookup(&lookup_key)).await?;
        let stale = match lookup {
            Lookup::Fresh(entry) if !force_refresh => match entry.decode::<Resolved>() {
                Ok(resolved) => {
                    log::debug!("Resolved {key} from cache");
                    return Ok(resolved);
                }
                Err(e) => {
                    log::warn!("Discarding undecodable cache entry {key}: {e}");
                    None
                }
            },
            Lookup::Fresh(entry) | Lookup::Expired(entry) => Some(entry),
            Lookup::Missing => None,
        };

        let reconciler = self.reconciler.clone();
        let task_key = key.clone();
        let id = source_id.to_string();
        let task = tokio::spawn(async move {
            reconciler
                .fetch_and_store(provider.as_ref(), &id, task_key)
                .await
        });

        match task.await? {
            Ok(resolved) => Ok(resolved),
            Err(EngineError::Provider(e)) if e.is_degradable() => {
                match stale.as_ref().and_then(decode_stale) {
                    Some(mut resolved) => {
                        log::warn!("{source} unavailable ({e}); serving cached {key}");
                        resolved.degraded = true;
                        Ok(resolved)
                    }
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Drop cached payloads for one source, or every cache entry (chapter
    /// counts included) when `source` is `None`. Returns the number removed.
    pub fn invalidate_cache(&self, source: Option<&str>) -> Result<usize, EngineError> {
        let removed = self.reconciler.cache.invalidate_source(source)?;
        log::info!("Removed {removed} cache entries");
        Ok(removed)
    }
}

impl Reconciler {
    async fn fetch_and_store(
        &self,
        provider: &dyn MetadataProvider,
        source_id: &str,
        key: CacheKey,
    ) -> Result<Resolved, EngineError> {
        let resolved = self.fetch(provider, source_id).await?;

        let store = self.store.clone();
        let record = resolved.clone();
        tokio::task::spawn_blocking(move || persist(&store, &record)).await??;

        let ttl = self.cache_ttl;
        let payload = resolved.clone();
        cache::blocking(&self.cache, move |c| c.put_json(&key, &payload, ttl)).await?;

        log::info!(
            "Resolved {} '{}': {} chapters, {} volumes",
            resolved.work.work_ref(),
            resolved.work.title,
            resolved.chapters.len(),
            resolved.volumes.len()
        );
        Ok(resolved)
    }

    async fn fetch(
        &self,
        provider: &dyn MetadataProvider,
        source_id: &str,
    ) -> Result<Resolved, ProviderError> {
        let name = provider.name();
        let work = with_retries(&format!("{name} details {source_id}"), || {
            provider.fetch_details(source_id)
        })
        .await?;
        let work_ref = work.work_ref();

        let chapters = if provider.chapter_data_poor() {
            Vec::new()
        } else {
            with_retries(&format!("{name} chapters {source_id}"), || {
                provider.fetch_chapters(source_id)
            })
            .await?
        };

        if !chapters.is_empty() {
            let volumes = synthesize_volumes(&work_ref, &chapters, work.volume_count.unwrap_or(0));
            return Ok(Resolved {
                work,
                chapters,
                volumes,
                estimate: None,
                degraded: false,
            });
        }

        let mut estimate = match work.chapter_count {
            Some(chapters) if chapters > 0 => ChapterCountEstimate {
                work_ref: None,
                chapter_count: chapters,
                volume_count: match work.volume_count {
                    Some(v) if v > 0 => v,
                    _ => volumes_for(chapters),
                },
                source: name.to_string(),
                obtained_at: self.clock.now(),
            },
            _ => self.estimator.estimate(&work.title).await,
        };
        estimate.work_ref = Some(work_ref.clone());
        log::debug!(
            "Synthesizing {} chapters for {work_ref} (count from {})",
            estimate.chapter_count,
            estimate.source
        );

        let chapters = synthesize_chapters(&work, estimate.chapter_count, self.clock.today());
        let volumes = synthesize_volumes(&work_ref, &chapters, estimate.volume_count);
        Ok(Resolved {
            work,
            chapters,
            volumes,
            estimate: Some(estimate),
            degraded: false,
        })
    }
}

fn persist(store: &Store, resolved: &Resolved) -> Result<(), EngineError> {
    let work_ref: WorkRef = resolved.work.work_ref();
    store.execute_with_retry(|conn| {
        readcal_db::upsert_work(conn, &resolved.work)?;
        readcal_db::replace_chapters(conn, &work_ref, &resolved.chapters)?;
        readcal_db::replace_volumes(conn, &work_ref, &resolved.volumes)?;
        Ok(())
    })?;
    Ok(())
}

fn decode_stale(entry: &CacheEntry) -> Option<Resolved> {
    match entry.decode::<Resolved>() {
        Ok(resolved) => Some(resolved),
        Err(e) => {
            log::warn!("Stale cache entry is undecodable: {e}");
            None
        }
    }
}

fn flatten_fan_out(
    results: Vec<(&'static str, Result<Vec<Work>, ProviderError>)>,
    what: &str,
) -> Vec<Work> {
    let mut works = Vec::new();
    for (name, result) in results {
        match result {
            Ok(found) => works.extend(found),
            Err(e) => log::warn!("{name} {what} failed, skipping: {e}"),
        }
    }
    works
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
