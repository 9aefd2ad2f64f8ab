//! Read queries for works, releases, cache entries and calendar events.

use chrono::{DateTime, NaiveDate, Utc};
use readcal_core::{
    CalendarEvent, Chapter, EventTarget, EventType, Volume, Work, WorkRef, WorkStatus,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::operations::{OperationError, date_str};

/// A raw cache row. Freshness is judged by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    pub payload: String,
    pub cached_at: DateTime<Utc>,
    pub ttl_secs: i64,
}

/// Row counts per table, for status output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub works: i64,
    pub chapters: i64,
    pub volumes: i64,
    pub cache_entries: i64,
    pub events: i64,
}

// ── Works ───────────────────────────────────────────────────────────────────

const WORK_COLUMNS: &str = "source, source_id, title, alternate_titles, status, genres, authors,
                            start_date, end_date, chapter_count, volume_count, description,
                            cover_url";

pub fn get_work(conn: &Connection, work_ref: &WorkRef) -> Result<Option<Work>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORK_COLUMNS} FROM works WHERE work_ref = ?1"
    ))?;
    let raw = stmt
        .query_row(params![work_ref.as_str()], RawWork::from_row)
        .optional()?;
    raw.map(RawWork::into_work).transpose()
}

/// Every tracked work, ordered by title.
pub fn list_works(conn: &Connection) -> Result<Vec<Work>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORK_COLUMNS} FROM works ORDER BY title COLLATE NOCASE"
    ))?;
    let rows = stmt.query_map([], RawWork::from_row)?;
    let raws = rows.collect::<Result<Vec<_>, _>>()?;
    raws.into_iter().map(RawWork::into_work).collect()
}

struct RawWork {
    source: String,
    source_id: String,
    title: String,
    alternate_titles: String,
    status: String,
    genres: String,
    authors: String,
    start_date: Option<String>,
    end_date: Option<String>,
    chapter_count: Option<u32>,
    volume_count: Option<u32>,
    description: Option<String>,
    cover_url: Option<String>,
}

impl RawWork {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            source: row.get(0)?,
            source_id: row.get(1)?,
            title: row.get(2)?,
            alternate_titles: row.get(3)?,
            status: row.get(4)?,
            genres: row.get(5)?,
            authors: row.get(6)?,
            start_date: row.get(7)?,
            end_date: row.get(8)?,
            chapter_count: row.get(9)?,
            volume_count: row.get(10)?,
            description: row.get(11)?,
            cover_url: row.get(12)?,
        })
    }

    fn into_work(self) -> Result<Work, OperationError> {
        let mut work = Work::new(self.source, self.source_id, self.title);
        work.alternate_titles = serde_json::from_str(&self.alternate_titles)?;
        work.status = self
            .status
            .parse::<WorkStatus>()
            .map_err(|_| OperationError::Decode {
                column: "status",
                value: self.status.clone(),
            })?;
        work.genres = serde_json::from_str(&self.genres)?;
        work.authors = serde_json::from_str(&self.authors)?;
        work.start_date = parse_date("start_date", self.start_date)?;
        work.end_date = parse_date("end_date", self.end_date)?;
        work.chapter_count = self.chapter_count;
        work.volume_count = self.volume_count;
        work.description = self.description;
        work.cover_url = self.cover_url;
        Ok(work)
    }
}

fn parse_date(column: &'static str, raw: Option<String>) -> Result<Option<NaiveDate>, OperationError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|_| OperationError::Decode { column, value: s })
    })
    .transpose()
}

// ── Chapters / Volumes ──────────────────────────────────────────────────────

/// Chapters of a work in ascending number order.
pub fn chapters_for_work(
    conn: &Connection,
    work_ref: &WorkRef,
) -> Result<Vec<Chapter>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT number, title, release_date, is_date_confirmed, synthesized
         FROM chapters WHERE work_ref = ?1 ORDER BY number",
    )?;
    let rows = stmt.query_map(params![work_ref.as_str()], |row| {
        Ok((
            row.get::<_, f64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, bool>(3)?,
            row.get::<_, bool>(4)?,
        ))
    })?;
    let mut chapters = Vec::new();
    for row in rows {
        let (number, title, date, is_date_confirmed, synthesized) = row?;
        chapters.push(Chapter {
            work_ref: work_ref.clone(),
            number,
            title,
            release_date: parse_date("release_date", date)?,
            is_date_confirmed,
            synthesized,
        });
    }
    Ok(chapters)
}

pub fn volumes_for_work(
    conn: &Connection,
    work_ref: &WorkRef,
) -> Result<Vec<Volume>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT number, title, release_date FROM volumes WHERE work_ref = ?1 ORDER BY number",
    )?;
    let rows = stmt.query_map(params![work_ref.as_str()], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;
    let mut volumes = Vec::new();
    for row in rows {
        let (number, title, date) = row?;
        volumes.push(Volume {
            work_ref: work_ref.clone(),
            number,
            title,
            release_date: parse_date("release_date", date)?,
        });
    }
    Ok(volumes)
}

// ── Cache ───────────────────────────────────────────────────────────────────

pub fn cache_get(
    conn: &Connection,
    source: &str,
    cache_type: &str,
    key: &str,
) -> Result<Option<CacheRow>, OperationError> {
    let row = conn
        .query_row(
            "SELECT payload, cached_at, ttl_secs FROM metadata_cache
             WHERE source = ?1 AND cache_type = ?2 AND cache_key = ?3",
            params![source, cache_type, key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(payload, ts, ttl_secs)| {
        let cached_at = DateTime::from_timestamp(ts, 0).ok_or(OperationError::Decode {
            column: "cached_at",
            value: ts.to_string(),
        })?;
        Ok(CacheRow {
            payload,
            cached_at,
            ttl_secs,
        })
    })
    .transpose()
}

// ── Calendar ────────────────────────────────────────────────────────────────

/// Events with `start <= event_date <= end`, ordered by date then work.
pub fn events_between(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    work_ref: Option<&WorkRef>,
) -> Result<Vec<CalendarEvent>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT work_ref, event_type, target_ref, event_date, title FROM calendar_events
         WHERE event_date >= ?1 AND event_date <= ?2 AND (?3 IS NULL OR work_ref = ?3)
         ORDER BY event_date, work_ref, id",
    )?;
    let rows = stmt.query_map(
        params![
            date_str(Some(start)),
            date_str(Some(end)),
            work_ref.map(|r| r.as_str())
        ],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        },
    )?;

    let mut events = Vec::new();
    for row in rows {
        let (work_ref, event_type, target_ref, event_date, title) = row?;
        let decode = |column: &'static str, value: &str| OperationError::Decode {
            column,
            value: value.to_string(),
        };
        let event_type = EventType::parse(&event_type).ok_or_else(|| decode("event_type", &event_type))?;
        let target = EventTarget::from_parts(event_type, &target_ref)
            .ok_or_else(|| decode("target_ref", &target_ref))?;
        let event_date = parse_date("event_date", Some(event_date))?
            .ok_or_else(|| decode("event_date", ""))?;
        events.push(CalendarEvent {
            work_ref: WorkRef::from(work_ref),
            target,
            event_date,
            title,
        });
    }
    Ok(events)
}

pub fn count_events(conn: &Connection) -> Result<i64, OperationError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM calendar_events", [], |row| row.get(0))?)
}

pub fn store_stats(conn: &Connection) -> Result<StoreStats, OperationError> {
    let count = |table: &str| -> Result<i64, OperationError> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
    };
    Ok(StoreStats {
        works: count("works")?,
        chapters: count("chapters")?,
        volumes: count("volumes")?,
        cache_entries: count("metadata_cache")?,
        events: count("calendar_events")?,
    })
}
