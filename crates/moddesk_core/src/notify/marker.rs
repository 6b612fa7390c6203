//! Persisted monotonic `last_update` marker implementations.
//!
//! # Responsibility
//! - Provide the single piece of cross-process shared mutable state used by
//!   the polling fallback.
//!
//! # Invariants
//! - `advance()` strictly increases the marker, even when called twice
//!   within one millisecond.
//! - Readers treat "equal" as no change and "greater" as changed.

use crate::notify::{NotifyError, NotifyResult};
use rusqlite::Connection;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared monotonic update marker.
pub trait UpdateMarker: Send + Sync {
    /// Advances the marker and returns the new value.
    fn advance(&self) -> NotifyResult<i64>;
    /// Reads the current marker value without changing it.
    fn current(&self) -> NotifyResult<i64>;
}

/// Marker stored in the `moderation_meta` table.
///
/// Owns its connection; for file databases every process sharing the file
/// observes the same marker.
pub struct SqliteUpdateMarker {
    conn: Mutex<Connection>,
}

impl SqliteUpdateMarker {
    /// Wraps a migrated connection; the marker row is seeded by migrations.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl UpdateMarker for SqliteUpdateMarker {
    fn advance(&self) -> NotifyResult<i64> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = conn.execute(
            "UPDATE moderation_meta SET value = MAX(value + 1, ?1) WHERE key = 'last_update';",
            [unix_millis()],
        )?;
        if changed == 0 {
            return Err(NotifyError::MarkerMissing);
        }
        read_marker(&conn)
    }

    fn current(&self) -> NotifyResult<i64> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        read_marker(&conn)
    }
}

/// Process-local marker for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryUpdateMarker {
    value: AtomicI64,
}

impl InMemoryUpdateMarker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateMarker for InMemoryUpdateMarker {
    fn advance(&self) -> NotifyResult<i64> {
        let now = unix_millis();
        let mut current = self.value.load(Ordering::SeqCst);
        loop {
            let next = now.max(current + 1);
            match self.value.compare_exchange(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(next),
                Err(observed) => current = observed,
            }
        }
    }

    fn current(&self) -> NotifyResult<i64> {
        Ok(self.value.load(Ordering::SeqCst))
    }
}

fn read_marker(conn: &Connection) -> NotifyResult<i64> {
    use rusqlite::OptionalExtension;

    let value = conn
        .query_row(
            "SELECT value FROM moderation_meta WHERE key = 'last_update';",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    value.ok_or(NotifyError::MarkerMissing)
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
