//! Write operations: works, chapters, volumes, cache entries, calendar events.

use chrono::{DateTime, NaiveDate, Utc};
use readcal_core::{CalendarEvent, Chapter, Volume, Work, WorkRef};
use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode column: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Invalid value in column '{column}': {value}")]
    Decode { column: &'static str, value: String },
}

pub(crate) fn date_str(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

// ── Work Operations ─────────────────────────────────────────────────────────

/// Insert a work, or refresh its descriptive fields if it already exists.
///
/// The identity columns are never updated.
pub fn upsert_work(conn: &Connection, work: &Work) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO works (work_ref, source, source_id, title, alternate_titles, status,
                            genres, authors, start_date, end_date, chapter_count,
                            volume_count, description, cover_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(work_ref) DO UPDATE SET
             title = excluded.title,
             alternate_titles = excluded.alternate_titles,
             status = excluded.status,
             genres = excluded.genres,
             authors = excluded.authors,
             start_date = excluded.start_date,
             end_date = excluded.end_date,
             chapter_count = excluded.chapter_count,
             volume_count = excluded.volume_count,
             description = excluded.description,
             cover_url = excluded.cover_url,
             updated_at = datetime('now')",
        params![
            work.work_ref().as_str(),
            work.source,
            work.source_id,
            work.title,
            serde_json::to_string(&work.alternate_titles)?,
            work.status.as_str(),
            serde_json::to_string(&work.genres)?,
            serde_json::to_string(&work.authors)?,
            date_str(work.start_date),
            date_str(work.end_date),
            work.chapter_count,
            work.volume_count,
            work.description,
            work.cover_url,
        ],
    )?;
    Ok(())
}

/// Delete a work. Chapters, volumes and calendar events cascade.
pub fn delete_work(conn: &Connection, work_ref: &WorkRef) -> Result<bool, OperationError> {
    let n = conn.execute(
        "DELETE FROM works WHERE work_ref = ?1",
        params![work_ref.as_str()],
    )?;
    Ok(n > 0)
}

// ── Chapter / Volume Operations ─────────────────────────────────────────────

/// Replace every chapter of a work in one transaction.
pub fn replace_chapters(
    conn: &Connection,
    work_ref: &WorkRef,
    chapters: &[Chapter],
) -> Result<usize, OperationError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM chapters WHERE work_ref = ?1",
        params![work_ref.as_str()],
    )?;
    {
        // Duplicate numbers from a source collapse onto the first row.
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO chapters
                 (work_ref, number, title, release_date, is_date_confirmed, synthesized)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for ch in chapters {
            stmt.execute(params![
                work_ref.as_str(),
                ch.number,
                ch.title,
                date_str(ch.release_date),
                ch.is_date_confirmed,
                ch.synthesized,
            ])?;
        }
    }
    tx.commit()?;
    Ok(chapters.len())
}

/// Replace every volume of a work in one transaction.
pub fn replace_volumes(
    conn: &Connection,
    work_ref: &WorkRef,
    volumes: &[Volume],
) -> Result<usize, OperationError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM volumes WHERE work_ref = ?1",
        params![work_ref.as_str()],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO volumes (work_ref, number, title, release_date)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for v in volumes {
            stmt.execute(params![
                work_ref.as_str(),
                v.number,
                v.title,
                date_str(v.release_date),
            ])?;
        }
    }
    tx.commit()?;
    Ok(volumes.len())
}

// ── Cache Operations ────────────────────────────────────────────────────────

/// Write a cache entry, replacing any previous payload under the same key.
pub fn cache_put(
    conn: &Connection,
    source: &str,
    cache_type: &str,
    key: &str,
    payload: &str,
    cached_at: DateTime<Utc>,
    ttl_secs: i64,
) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO metadata_cache (source, cache_type, cache_key, payload, cached_at, ttl_secs)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(source, cache_type, cache_key) DO UPDATE SET
             payload = excluded.payload,
             cached_at = excluded.cached_at,
             ttl_secs = excluded.ttl_secs",
        params![source, cache_type, key, payload, cached_at.timestamp(), ttl_secs],
    )?;
    Ok(())
}

pub fn cache_delete(
    conn: &Connection,
    source: &str,
    cache_type: &str,
    key: &str,
) -> Result<bool, OperationError> {
    let n = conn.execute(
        "DELETE FROM metadata_cache WHERE source = ?1 AND cache_type = ?2 AND cache_key = ?3",
        params![source, cache_type, key],
    )?;
    Ok(n > 0)
}

/// Delete an entry only if it still carries the `cached_at` the caller read.
/// A concurrent `cache_put` for the same key survives.
pub fn cache_delete_if_unchanged(
    conn: &Connection,
    source: &str,
    cache_type: &str,
    key: &str,
    cached_at: DateTime<Utc>,
) -> Result<bool, OperationError> {
    let n = conn.execute(
        "DELETE FROM metadata_cache
         WHERE source = ?1 AND cache_type = ?2 AND cache_key = ?3 AND cached_at = ?4",
        params![source, cache_type, key, cached_at.timestamp()],
    )?;
    Ok(n > 0)
}

/// Delete every cache entry matching the given filters. `None` matches all.
pub fn cache_delete_matching(
    conn: &Connection,
    source: Option<&str>,
    cache_type: Option<&str>,
) -> Result<usize, OperationError> {
    let n = conn.execute(
        "DELETE FROM metadata_cache
         WHERE (?1 IS NULL OR source = ?1) AND (?2 IS NULL OR cache_type = ?2)",
        params![source, cache_type],
    )?;
    Ok(n)
}

// ── Calendar Operations ─────────────────────────────────────────────────────

/// Insert an event. Returns false when an event with the same
/// `(work_ref, target, event_date)` already exists.
pub fn insert_event(conn: &Connection, event: &CalendarEvent) -> Result<bool, OperationError> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO calendar_events (work_ref, event_type, target_ref, event_date, title)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.work_ref.as_str(),
            event.event_type().as_str(),
            event.target.reference(),
            event.event_date.format("%Y-%m-%d").to_string(),
            event.title,
        ],
    )?;
    Ok(n > 0)
}

/// Delete every event dated strictly before `cutoff`.
pub fn prune_events_before(conn: &Connection, cutoff: NaiveDate) -> Result<usize, OperationError> {
    let n = conn.execute(
        "DELETE FROM calendar_events WHERE event_date < ?1",
        params![cutoff.format("%Y-%m-%d").to_string()],
    )?;
    Ok(n)
}
