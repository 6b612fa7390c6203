//! Change-notification hub and the shared `last_update` marker.
//!
//! # Responsibility
//! - Fan "something changed" signals out to registered listeners.
//! - Detect changes made by other processes through a persisted monotonic
//!   marker and a low-frequency poll.
//!
//! # Invariants
//! - The marker only ever advances; equal means "no change".
//! - Listener delivery is sequential with per-listener error isolation.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod hub;
pub mod marker;

pub use hub::{DeliveryReport, NotificationHub, UpdateListener};
pub use marker::{InMemoryUpdateMarker, SqliteUpdateMarker, UpdateMarker};

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors raised by the hub or the marker store.
#[derive(Debug)]
pub enum NotifyError {
    Db(DbError),
    /// The marker row is missing; the store was not migrated.
    MarkerMissing,
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MarkerMissing => write!(f, "last_update marker row is missing"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MarkerMissing => None,
        }
    }
}

impl From<DbError> for NotifyError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for NotifyError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Failure reported by a listener during delivery.
///
/// Carries only a message; delivery failures are logged and never retried,
/// the polling fallback is the backstop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ListenerError {}
