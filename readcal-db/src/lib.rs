//! SQLite persistence for tracked works, their releases, the metadata cache
//! and the materialized calendar.
//!
//! Provides schema creation, write operations, and query APIs backed by
//! SQLite (via rusqlite with the bundled feature).

pub mod operations;
pub mod queries;
pub mod schema;
pub mod store;

pub use operations::{
    OperationError, cache_delete, cache_delete_if_unchanged, cache_delete_matching, cache_put, delete_work, insert_event,
    prune_events_before, replace_chapters, replace_volumes, upsert_work,
};
pub use queries::{
    CacheRow, StoreStats, cache_get, chapters_for_work, count_events, events_between, get_work,
    list_works, store_stats, volumes_for_work,
};
pub use schema::{CURRENT_VERSION, SchemaError, get_schema_version, open_database, open_memory};
pub use store::{Store, StoreError};
