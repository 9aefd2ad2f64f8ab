use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use readcal_core::FixedClock;

use super::*;
use crate::cache::MemoryCache;

enum Reply {
    Count(u32, u32),
    Nothing,
    Fail,
    Hang,
    Slow(u32, u32),
}

struct StubCounts {
    name: &'static str,
    reply: Reply,
    calls: AtomicUsize,
}

impl StubCounts {
    fn new(name: &'static str, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CountProvider for StubCounts {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn count(&self, _title: &str) -> Result<Option<CountCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Reply::Count(c, v) => Ok(Some(CountCandidate::new(self.name, c, v))),
            Reply::Nothing => Ok(None),
            Reply::Fail => Err(ProviderError::unavailable("503")),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
            Reply::Slow(c, v) => {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(Some(CountCandidate::new(self.name, c, v)))
            }
        }
    }
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
}

fn estimator(
    providers: Vec<Arc<StubCounts>>,
    cache: Arc<dyn CacheStore>,
    heuristic: Option<u32>,
) -> ChapterCountEstimator {
    let mut config = EstimatorConfig {
        provider_timeout: Duration::from_secs(1),
        ..EstimatorConfig::default()
    };
    if let Some(n) = heuristic {
        config.heuristic = Arc::new(move |_: &str| n);
    }
    let providers = providers
        .into_iter()
        .map(|p| p as Arc<dyn CountProvider>)
        .collect();
    ChapterCountEstimator::new(providers, cache, clock(), config)
}

fn memory_cache() -> Arc<dyn CacheStore> {
    Arc::new(MemoryCache::new(clock()))
}

#[tokio::test]
async fn all_zero_providers_fall_back_to_heuristic_and_cache() {
    let cache = memory_cache();
    let providers = vec![
        StubCounts::new("a", Reply::Count(0, 0)),
        StubCounts::new("b", Reply::Count(0, 0)),
        StubCounts::new("c", Reply::Count(0, 0)),
    ];
    let est = estimator(providers, cache.clone(), Some(48));

    let result = est.estimate("Some Obscure Title").await;
    assert_eq!((result.chapter_count, result.volume_count), (48, 4));
    assert_eq!(result.source, SOURCE_HEURISTIC);

    let key = CacheKey::new("estimator", "chapter_count", "some obscure title");
    let cached: ChapterCountEstimate = cache.get_json(&key).unwrap().unwrap();
    assert_eq!(cached.chapter_count, 48);
    assert_eq!(cached.volume_count, 4);
}

#[tokio::test]
async fn largest_count_wins() {
    let providers = vec![
        StubCounts::new("a", Reply::Count(50, 5)),
        StubCounts::new("b", Reply::Count(200, 20)),
        StubCounts::new("c", Reply::Nothing),
    ];
    let result = estimator(providers, memory_cache(), Some(10))
        .estimate("Title")
        .await;
    assert_eq!(result.source, "b");
    assert_eq!((result.chapter_count, result.volume_count), (200, 20));
}

#[tokio::test]
async fn ties_go_to_declared_priority() {
    let providers = vec![
        StubCounts::new("first", Reply::Count(120, 12)),
        StubCounts::new("second", Reply::Count(120, 11)),
    ];
    let result = estimator(providers, memory_cache(), Some(120))
        .estimate("Title")
        .await;
    assert_eq!(result.source, "first");
}

#[tokio::test]
async fn winner_without_volumes_gets_derived_volumes() {
    let providers = vec![StubCounts::new("a", Reply::Count(95, 0))];
    let result = estimator(providers, memory_cache(), Some(10))
        .estimate("Title")
        .await;
    assert_eq!((result.chapter_count, result.volume_count), (95, 9));
}

#[tokio::test]
async fn failures_are_excluded_not_fatal() {
    let providers = vec![
        StubCounts::new("a", Reply::Fail),
        StubCounts::new("b", Reply::Count(64, 7)),
        StubCounts::new("c", Reply::Fail),
    ];
    let result = estimator(providers, memory_cache(), Some(10))
        .estimate("Title")
        .await;
    assert_eq!(result.source, "b");
}

#[tokio::test]
async fn floor_when_everything_is_zero() {
    let providers = vec![StubCounts::new("a", Reply::Fail)];
    let result = estimator(providers, memory_cache(), Some(0))
        .estimate("Title")
        .await;
    assert_eq!((result.chapter_count, result.volume_count), FLOOR);
    assert_eq!(result.source, SOURCE_FLOOR);
}

#[tokio::test(start_paused = true)]
async fn hung_provider_times_out_alone() {
    let providers = vec![
        StubCounts::new("slow", Reply::Hang),
        StubCounts::new("fast", Reply::Count(30, 3)),
    ];
    let result = estimator(providers, memory_cache(), Some(10))
        .estimate("Title")
        .await;
    assert_eq!(result.source, "fast");
}

#[tokio::test(start_paused = true)]
async fn abandoned_estimate_still_caches_winner() {
    let cache = memory_cache();
    let est = estimator(vec![StubCounts::new("a", Reply::Slow(90, 9))], cache.clone(), Some(10));

    let gave_up =
        tokio::time::timeout(Duration::from_millis(100), est.estimate("Slow Title")).await;
    assert!(gave_up.is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let key = CacheKey::new(CACHE_SOURCE, CACHE_KIND, normalize_title("Slow Title"));
    let cached: Option<ChapterCountEstimate> = cache.get_json(&key).unwrap();
    let cached = cached.expect("race result cached after caller gave up");
    assert_eq!((cached.chapter_count, cached.source.as_str()), (90, "a"));
}

#[tokio::test]
async fn known_work_skips_race() {
    let stub = StubCounts::new("a", Reply::Count(5000, 500));
    let est = estimator(vec![stub.clone()], memory_cache(), None);

    let result = est.estimate("One Piece").await;
    assert_eq!((result.chapter_count, result.volume_count), (1112, 108));
    assert_eq!(result.source, SOURCE_KNOWN);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn decorated_known_title_goes_to_race() {
    let provider = StubCounts::new("a", Reply::Count(1200, 0));
    let est = estimator(vec![provider.clone()], memory_cache(), Some(10));

    let result = est.estimate("One Piece (Colored)").await;
    assert_eq!(result.source, "a");
    assert_eq!(result.chapter_count, 1200);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_winner_skips_race() {
    let stub = StubCounts::new("a", Reply::Count(80, 8));
    let est = estimator(vec![stub.clone()], memory_cache(), Some(10));

    let first = est.estimate("Title").await;
    let second = est.estimate("TITLE!").await;
    assert_eq!(first, second);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn estimate_is_deterministic() {
    let make = || {
        vec![
            StubCounts::new("a", Reply::Count(70, 7)),
            StubCounts::new("b", Reply::Count(70, 6)),
            StubCounts::new("c", Reply::Fail),
        ]
    };
    for _ in 0..5 {
        let result = estimator(make(), memory_cache(), Some(70))
            .estimate("Title")
            .await;
        assert_eq!((result.source.as_str(), result.volume_count), ("a", 7));
    }
}

#[test]
fn pattern_heuristic_values() {
    assert_eq!(pattern_heuristic("berserk"), 112);
    assert_eq!(pattern_heuristic("two words"), 75);
    assert_eq!(pattern_heuristic("vinland saga"), 97);
    assert_eq!(pattern_heuristic("the rising of the shield hero"), 45);
    assert_eq!(pattern_heuristic("the legend of zelda chronicles"), 58);
    assert_eq!(pattern_heuristic("legend"), 146);
}

#[test]
fn select_winner_prefers_providers_on_tie_with_heuristic() {
    let heuristic = CountCandidate::new(SOURCE_HEURISTIC, 75, 7);
    let winner = select_winner(&[CountCandidate::new("a", 75, 8)], heuristic.clone());
    assert_eq!(winner.source, "a");
    assert_eq!(select_winner(&[], heuristic.clone()), heuristic);
}
