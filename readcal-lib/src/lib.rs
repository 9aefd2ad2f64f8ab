//! Release-metadata reconciliation for readcal.
//!
//! The [`Engine`] resolves a work from a metadata source, estimating chapter
//! counts and synthesizing release dates when the source has none. The
//! [`CalendarMaterializer`] then turns stored release dates into calendar
//! events.

pub mod cache;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod known_works;
pub mod schedule;
pub mod settings;
pub mod worker_pool;

pub use cache::{CacheEntry, CacheKey, CacheStore, DbCache, Lookup, MemoryCache};
pub use calendar::{CalendarMaterializer, MaterializeStats};
pub use engine::{Engine, RESOLVED_KIND, Resolved};
pub use error::{CacheError, EngineError, SettingsError};
pub use estimator::{ChapterCountEstimator, EstimatorConfig, Heuristic, pattern_heuristic};
pub use schedule::{Cadence, infer_cadence, synthesize_chapters, synthesize_volumes};
pub use settings::Settings;
pub use worker_pool::WorkerPool;
