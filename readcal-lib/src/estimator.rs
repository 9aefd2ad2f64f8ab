//! Chapter-count estimation.
//!
//! Order of precedence: curated table, cached winner, then a race between
//! every enabled count provider plus a title heuristic. The largest positive
//! count wins; ties go to the provider registered first, with the heuristic
//! ranked last.

use std::sync::Arc;
use std::time::Duration;

use readcal_core::{
    ChapterCountEstimate, Clock, CountCandidate, ProviderError, normalize_title,
};
use readcal_providers::CountProvider;

use crate::cache::{self, CacheKey, CacheStore};
use crate::known_works;
use crate::worker_pool::WorkerPool;

pub const CACHE_SOURCE: &str = "estimator";
pub const CACHE_KIND: &str = "chapter_count";

pub const SOURCE_KNOWN: &str = "known";
pub const SOURCE_HEURISTIC: &str = "heuristic";
pub const SOURCE_FLOOR: &str = "floor";

/// Returned when every candidate, heuristic included, reports zero chapters.
pub const FLOOR: (u32, u32) = (20, 2);

/// Chapter count guessed from a title alone.
pub type Heuristic = Arc<dyn Fn(&str) -> u32 + Send + Sync>;

const BASE_CHAPTERS: u32 = 75;
const LONG_SERIES_WORDS: &[&str] = &["chronicles", "saga", "legend", "adventure"];

/// Title-shape heuristic: short titles tend to run longer, and a few words
/// hint at long-running series.
pub fn pattern_heuristic(title: &str) -> u32 {
    let lower = title.to_lowercase();
    let words = lower.split_whitespace().count();

    // Percent factor keeps the arithmetic exact.
    let mut factor: u32 = match words {
        1 => 150,
        w if w >= 4 => 60,
        _ => 100,
    };
    if LONG_SERIES_WORDS.iter().any(|w| lower.contains(w)) {
        factor = factor * 130 / 100;
    }
    BASE_CHAPTERS * factor / 100
}

/// Volumes implied by a chapter count when no source reports them.
pub fn volumes_for(chapters: u32) -> u32 {
    (chapters / 10).max(1)
}

#[derive(Clone)]
pub struct EstimatorConfig {
    pub concurrency: usize,
    pub provider_timeout: Duration,
    pub cache_ttl: chrono::Duration,
    pub heuristic: Heuristic,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            provider_timeout: Duration::from_secs(10),
            cache_ttl: chrono::Duration::days(7),
            heuristic: Arc::new(pattern_heuristic),
        }
    }
}

#[derive(Clone)]
pub struct ChapterCountEstimator {
    providers: Vec<Arc<dyn CountProvider>>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    config: EstimatorConfig,
}

impl ChapterCountEstimator {
    /// `providers` must be in priority order.
    pub fn new(
        providers: Vec<Arc<dyn CountProvider>>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: EstimatorConfig,
    ) -> Self {
        Self {
            providers,
            cache,
            clock,
            config,
        }
    }

    /// Estimate chapter and volume totals for `title`. Never fails; every
    /// provider problem is logged and that provider excluded.
    ///
    /// The race runs as its own task, so a caller that stops waiting does
    /// not cancel it: the winner is still selected and cached.
    pub async fn estimate(&self, title: &str) -> ChapterCountEstimate {
        let normalized = normalize_title(title);

        if let Some((chapters, volumes)) = known_works::lookup(&normalized) {
            log::debug!("'{title}' found in known works table");
            return self.make_estimate(chapters, volumes, SOURCE_KNOWN);
        }

        let key = CacheKey::new(CACHE_SOURCE, CACHE_KIND, normalized.clone());
        let lookup_key = key.clone();
        let cached =
            cache::blocking(&self.cache, move |c| c.get_json::<ChapterCountEstimate>(&lookup_key))
                .await;
        match cached {
            Ok(Some(cached)) => {
                log::debug!("Chapter count for '{title}' served from cache");
                return cached;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring unreadable cached chapter count for '{title}': {e}"),
        }

        let this = self.clone();
        let owned_title = title.to_string();
        let task_normalized = normalized.clone();
        let race = tokio::spawn(async move {
            this.race_and_store(&owned_title, &task_normalized, key).await
        });
        match race.await {
            Ok(estimate) => estimate,
            Err(e) => {
                log::warn!("Chapter count race for '{title}' failed: {e}");
                self.settle(&[], &normalized)
            }
        }
    }

    async fn race_and_store(
        &self,
        title: &str,
        normalized: &str,
        key: CacheKey,
    ) -> ChapterCountEstimate {
        let candidates = self.race(title).await;
        let estimate = self.settle(&candidates, normalized);
        log::info!(
            "Estimated '{}' at {} chapters / {} volumes (from {})",
            title,
            estimate.chapter_count,
            estimate.volume_count,
            estimate.source
        );

        let ttl = self.config.cache_ttl;
        let value = estimate.clone();
        if let Err(e) = cache::blocking(&self.cache, move |c| c.put_json(&key, &value, ttl)).await {
            log::warn!("Failed to cache chapter count for '{title}': {e}");
        }
        estimate
    }

    /// Pick the winner among `candidates` and the title heuristic, falling
    /// back to [`FLOOR`] when nothing reports a chapter.
    fn settle(&self, candidates: &[CountCandidate], normalized: &str) -> ChapterCountEstimate {
        let heuristic_chapters = (self.config.heuristic)(normalized);
        let heuristic = CountCandidate::new(
            SOURCE_HEURISTIC,
            heuristic_chapters,
            volumes_for(heuristic_chapters),
        );

        let winner = select_winner(candidates, heuristic);
        if winner.chapter_count == 0 {
            return self.make_estimate(FLOOR.0, FLOOR.1, SOURCE_FLOOR);
        }
        // Ongoing series often report chapters without volumes.
        let volumes = match winner.volume_count {
            0 => volumes_for(winner.chapter_count),
            v => v,
        };
        self.make_estimate(winner.chapter_count, volumes, &winner.source)
    }

    /// Run every count provider concurrently and wait for all of them.
    /// Returns positive candidates in provider priority order.
    async fn race(&self, title: &str) -> Vec<CountCandidate> {
        if self.providers.is_empty() {
            return Vec::new();
        }

        let items: Vec<(usize, Arc<dyn CountProvider>)> =
            self.providers.iter().cloned().enumerate().collect();
        let shared_title: Arc<str> = Arc::from(title);
        let timeout = self.config.provider_timeout;

        let pool = WorkerPool::start(self.config.concurrency, items, move |(rank, provider)| {
            let title = shared_title.clone();
            async move {
                let name = provider.name();
                let result = match tokio::time::timeout(timeout, provider.count(&title)).await {
                    Ok(r) => r,
                    Err(_) => Err(ProviderError::unavailable(format!(
                        "no answer within {}s",
                        timeout.as_secs()
                    ))),
                };
                (rank, name, result)
            }
        });
        let mut results = pool.join().await;
        results.sort_by_key(|(rank, _, _)| *rank);

        let mut candidates = Vec::new();
        for (_, name, result) in results {
            match result {
                Ok(Some(c)) if c.chapter_count > 0 => candidates.push(c),
                Ok(_) => log::debug!("{name} has no chapter count for '{title}'"),
                Err(e) => log::warn!("Excluding {name} from chapter count race: {e}"),
            }
        }
        candidates
    }

    fn make_estimate(&self, chapters: u32, volumes: u32, source: &str) -> ChapterCountEstimate {
        ChapterCountEstimate {
            work_ref: None,
            chapter_count: chapters,
            volume_count: volumes,
            source: source.to_string(),
            obtained_at: self.clock.now(),
        }
    }
}

/// Largest chapter count wins. `candidates` are in priority order and only
/// a strictly larger count displaces an earlier one, so ties keep the
/// higher-priority source. The heuristic is considered last.
pub fn select_winner(candidates: &[CountCandidate], heuristic: CountCandidate) -> CountCandidate {
    let mut best: Option<&CountCandidate> = None;
    for c in candidates {
        if best.is_none_or(|b| c.chapter_count > b.chapter_count) {
            best = Some(c);
        }
    }
    match best {
        Some(b) if b.chapter_count >= heuristic.chapter_count => b.clone(),
        _ => heuristic,
    }
}

#[cfg(test)]
#[path = "tests/estimator_tests.rs"]
mod tests;
