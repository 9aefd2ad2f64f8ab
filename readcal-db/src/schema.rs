//! SQLite schema creation and migration.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: expected version {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 2;

/// Create all tables and indexes if they don't exist.
///
/// This is idempotent; safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Open or create a database at the given path, migrating it if needed.
pub fn open_database(path: &std::path::Path) -> Result<Connection, SchemaError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let version = get_schema_version(&conn)?;
    if version == 0 {
        create_schema(&conn)?;
    } else if version != CURRENT_VERSION {
        migrate(&conn, version)?;
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Run migrations from `from_version` up to `CURRENT_VERSION`.
fn migrate(conn: &Connection, from_version: i32) -> Result<(), SchemaError> {
    if from_version > CURRENT_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: from_version,
        });
    }

    let mut version = from_version;
    while version < CURRENT_VERSION {
        if version == 1 {
            conn.execute_batch(
                "ALTER TABLE chapters ADD COLUMN synthesized BOOLEAN NOT NULL DEFAULT 0;",
            )?;
        }
        version += 1;
        set_schema_version(conn, version)?;
    }

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Tracked works, one row per (source, source_id)
CREATE TABLE IF NOT EXISTS works (
    work_ref TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    source_id TEXT NOT NULL,
    title TEXT NOT NULL,
    alternate_titles TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'UNKNOWN',
    genres TEXT NOT NULL DEFAULT '[]',
    authors TEXT NOT NULL DEFAULT '[]',
    start_date TEXT,
    end_date TEXT,
    chapter_count INTEGER,
    volume_count INTEGER,
    description TEXT,
    cover_url TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_works_identity ON works(source, source_id);

CREATE TABLE IF NOT EXISTS chapters (
    work_ref TEXT NOT NULL REFERENCES works(work_ref) ON DELETE CASCADE,
    number REAL NOT NULL,
    title TEXT NOT NULL,
    release_date TEXT,
    is_date_confirmed BOOLEAN NOT NULL DEFAULT 0,
    synthesized BOOLEAN NOT NULL DEFAULT 0,
    PRIMARY KEY (work_ref, number)
);

CREATE INDEX IF NOT EXISTS idx_chapters_release ON chapters(release_date);

CREATE TABLE IF NOT EXISTS volumes (
    work_ref TEXT NOT NULL REFERENCES works(work_ref) ON DELETE CASCADE,
    number INTEGER NOT NULL,
    title TEXT NOT NULL,
    release_date TEXT,
    PRIMARY KEY (work_ref, number)
);

CREATE INDEX IF NOT EXISTS idx_volumes_release ON volumes(release_date);

-- Serialized provider payloads keyed by (source, type, id)
CREATE TABLE IF NOT EXISTS metadata_cache (
    source TEXT NOT NULL,
    cache_type TEXT NOT NULL,
    cache_key TEXT NOT NULL,
    payload TEXT NOT NULL,
    cached_at INTEGER NOT NULL,
    ttl_secs INTEGER NOT NULL,
    PRIMARY KEY (source, cache_type, cache_key)
);

CREATE TABLE IF NOT EXISTS calendar_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    work_ref TEXT NOT NULL REFERENCES works(work_ref) ON DELETE CASCADE,
    event_type TEXT NOT NULL,
    target_ref TEXT NOT NULL,
    event_date TEXT NOT NULL,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(work_ref, event_type, target_ref, event_date)
);

CREATE INDEX IF NOT EXISTS idx_events_date ON calendar_events(event_date);
"#;
