//! Shared connection handle with retrying execution.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode};
use thiserror::Error;

use crate::operations::OperationError;
use crate::schema::{SchemaError, open_database, open_memory};

const MAX_RETRIES: u32 = 5;
const BASE_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("{0}")]
    Operation(#[from] OperationError),
    #[error("Database locked; gave up after {attempts} attempts")]
    Locked { attempts: u32 },
}

/// A single SQLite connection shared by all components.
///
/// Every statement goes through [`Store::execute_with_retry`], which retries
/// `SQLITE_BUSY` / `SQLITE_LOCKED` with exponential backoff.
pub struct Store {
    conn: Mutex<Connection>,
    base_backoff: Duration,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        log::debug!("Opening database at {}", path.display());
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn open_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(open_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            base_backoff: BASE_BACKOFF,
        }
    }

    /// Override the first retry delay. Later delays double from here.
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    /// Run `op` against the connection, retrying lock contention up to five
    /// times (0.5s, 1s, 2s, ...). Any other error is returned at once.
    ///
    /// Blocks the calling thread while backing off; call it from async code
    /// via `tokio::task::spawn_blocking`.
    pub fn execute_with_retry<T, F>(&self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut(&Connection) -> Result<T, OperationError>,
    {
        let mut attempt = 0;
        loop {
            let result = {
                let conn = self.lock();
                op(&conn)
            };
            match result {
                Ok(v) => return Ok(v),
                Err(e) if is_contention(&e) => {
                    if attempt >= MAX_RETRIES {
                        log::warn!("Database still locked after {} attempts", attempt + 1);
                        return Err(StoreError::Locked {
                            attempts: attempt + 1,
                        });
                    }
                    let delay = self.base_backoff * 2u32.pow(attempt);
                    attempt += 1;
                    log::debug!(
                        "Database busy, retry {attempt}/{MAX_RETRIES} in {}ms",
                        delay.as_millis()
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn is_contention(err: &OperationError) -> bool {
    match err {
        OperationError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
            e.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn busy() -> OperationError {
        OperationError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ))
    }

    #[test]
    fn retries_busy_then_succeeds() {
        let store = Store::open_memory().unwrap().with_backoff(Duration::from_millis(1));
        let calls = Cell::new(0);
        let result = store.execute_with_retry(|_| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err(busy()) } else { Ok(7) }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_with_locked() {
        let store = Store::open_memory().unwrap().with_backoff(Duration::from_millis(1));
        let calls = Cell::new(0);
        let result: Result<(), _> = store.execute_with_retry(|_| {
            calls.set(calls.get() + 1);
            Err(busy())
        });
        assert!(matches!(result, Err(StoreError::Locked { attempts: 6 })));
        assert_eq!(calls.get(), 6);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let store = Store::open_memory().unwrap();
        let calls = Cell::new(0);
        let result: Result<i64, _> = store.execute_with_retry(|conn| {
            calls.set(calls.get() + 1);
            Ok(conn.query_row("SELECT * FROM no_such_table", [], |r| r.get(0))?)
        });
        assert!(matches!(result, Err(StoreError::Operation(_))));
        assert_eq!(calls.get(), 1);
    }
}
