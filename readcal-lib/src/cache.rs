//! Keyed payload cache with a single ttl policy.
//!
//! Entries are whole serialized payloads; a write replaces the previous
//! payload atomically. An entry older than its ttl is evicted on the next
//! access, but [`CacheStore::lookup`] hands it back once as
//! [`Lookup::Expired`] so callers can fall back to it when a source is down.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use readcal_core::Clock;
use readcal_db::Store;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

/// `(source, type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub kind: String,
    pub id: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.source, self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub payload: String,
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at > self.ttl
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CacheError> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Fresh(CacheEntry),
    /// Past its ttl. Already evicted; this is the last time it is seen.
    Expired(CacheEntry),
    Missing,
}

impl Lookup {
    pub fn fresh(self) -> Option<CacheEntry> {
        match self {
            Lookup::Fresh(e) => Some(e),
            _ => None,
        }
    }
}

pub trait CacheStore: Send + Sync {
    fn lookup(&self, key: &CacheKey) -> Result<Lookup, CacheError>;

    fn put(&self, key: &CacheKey, payload: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove every entry whose key matches. Returns the number removed.
    fn invalidate(&self, predicate: &dyn Fn(&CacheKey) -> bool) -> Result<usize, CacheError>;

    /// Remove every entry from `source`, or everything when `None`.
    fn invalidate_source(&self, source: Option<&str>) -> Result<usize, CacheError> {
        match source {
            Some(name) => self.invalidate(&|k: &CacheKey| k.source == name),
            None => self.invalidate(&|_: &CacheKey| true),
        }
    }

    /// Fresh payload only.
    fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self.lookup(key)?.fresh().map(|e| e.payload))
    }
}

impl dyn CacheStore {
    /// Fresh entry decoded as `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, CacheError> {
        match self.get(key)? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    pub fn put_json<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.put(key, serde_json::to_string(value)?, ttl)
    }
}

/// Run `op` against `cache` on the blocking pool. A store-backed cache may
/// sleep between retries while the database is locked, which must not
/// happen on a runtime worker.
pub async fn blocking<T, F>(cache: &Arc<dyn CacheStore>, op: F) -> Result<T, CacheError>
where
    T: Send + 'static,
    F: FnOnce(&Arc<dyn CacheStore>) -> Result<T, CacheError> + Send + 'static,
{
    let cache = cache.clone();
    tokio::task::spawn_blocking(move || op(&cache)).await?
}

// -- In-memory --

/// Process-local cache. Used in tests and when no database is configured.
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an entry with an explicit timestamp.
    pub fn put_at(&self, key: &CacheKey, payload: String, cached_at: DateTime<Utc>, ttl: Duration) {
        let entry = CacheEntry {
            payload,
            cached_at,
            ttl,
        };
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key.clone(), entry);
    }
}

impl CacheStore for MemoryCache {
    fn lookup(&self, key: &CacheKey) -> Result<Lookup, CacheError> {
        let now = self.clock.now();
        {
            let map = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match map.get(key) {
                None => return Ok(Lookup::Missing),
                Some(entry) if !entry.is_expired(now) => return Ok(Lookup::Fresh(entry.clone())),
                Some(_) => {}
            }
        }
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // Another writer may have refreshed it between the two locks.
        match map.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(Lookup::Fresh(entry.clone())),
            Some(_) => {
                log::debug!("Cache entry {key} expired, evicting");
                Ok(map.remove(key).map_or(Lookup::Missing, Lookup::Expired))
            }
            None => Ok(Lookup::Missing),
        }
    }

    fn put(&self, key: &CacheKey, payload: String, ttl: Duration) -> Result<(), CacheError> {
        self.put_at(key, payload, self.clock.now(), ttl);
        Ok(())
    }

    fn invalidate(&self, predicate: &dyn Fn(&CacheKey) -> bool) -> Result<usize, CacheError> {
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = map.len();
        map.retain(|k, _| !predicate(k));
        Ok(before - map.len())
    }
}

// -- SQLite-backed --

/// Cache persisted in the `metadata_cache` table.
pub struct DbCache {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl DbCache {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Insert an entry with an explicit timestamp.
    pub fn put_at(
        &self,
        key: &CacheKey,
        payload: &str,
        cached_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.store.execute_with_retry(|conn| {
            readcal_db::cache_put(
                conn,
                &key.source,
                &key.kind,
                &key.id,
                payload,
                cached_at,
                ttl.num_seconds(),
            )
        })?;
        Ok(())
    }
}

impl CacheStore for DbCache {
    fn lookup(&self, key: &CacheKey) -> Result<Lookup, CacheError> {
        let now = self.clock.now();
        // Read and evict under one hold of the connection. The delete is
        // conditional on the row still being the one read, so a fresh put
        // from another connection is never lost.
        let found = self.store.execute_with_retry(|conn| {
            let Some(row) = readcal_db::cache_get(conn, &key.source, &key.kind, &key.id)? else {
                return Ok(None);
            };
            let entry = CacheEntry {
                payload: row.payload,
                cached_at: row.cached_at,
                ttl: Duration::seconds(row.ttl_secs),
            };
            if !entry.is_expired(now) {
                return Ok(Some((entry, false)));
            }
            let evicted = readcal_db::cache_delete_if_unchanged(
                conn,
                &key.source,
                &key.kind,
                &key.id,
                entry.cached_at,
            )?;
            Ok(Some((entry, evicted)))
        })?;

        match found {
            None => Ok(Lookup::Missing),
            Some((entry, _)) if !entry.is_expired(now) => Ok(Lookup::Fresh(entry)),
            Some((entry, evicted)) => {
                if evicted {
                    log::debug!("Cache entry {key} expired, evicted");
                }
                Ok(Lookup::Expired(entry))
            }
        }
    }

    fn put(&self, key: &CacheKey, payload: String, ttl: Duration) -> Result<(), CacheError> {
        self.put_at(key, &payload, self.clock.now(), ttl)
    }

    fn invalidate(&self, predicate: &dyn Fn(&CacheKey) -> bool) -> Result<usize, CacheError> {
        let removed = self.store.execute_with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            let keys = {
                let mut stmt =
                    tx.prepare("SELECT source, cache_type, cache_key FROM metadata_cache")?;
                let rows = stmt.query_map([], |row| {
                    Ok(CacheKey::new(
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            let mut removed = 0;
            for key in keys.iter().filter(|k| predicate(k)) {
                if readcal_db::cache_delete(&tx, &key.source, &key.kind, &key.id)? {
                    removed += 1;
                }
            }
            tx.commit()?;
            Ok(removed)
        })?;
        Ok(removed)
    }

    fn invalidate_source(&self, source: Option<&str>) -> Result<usize, CacheError> {
        Ok(self
            .store
            .execute_with_retry(|conn| readcal_db::cache_delete_matching(conn, source, None))?)
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
