//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the moderation store.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Repository writes enforce model `validate()` before persistence.
//! - Repository APIs return semantic errors (`*NotFound`) in addition to DB
//!   transport errors.
//! - Assignment rows are created/destroyed wholesale, never partially
//!   mutated.

use crate::db::DbError;
use crate::model::comment::{CommentId, FlagId};
use crate::model::content::{ArticleId, CategoryId};
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod assignment_repo;
pub mod comment_repo;
pub mod content_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for moderation persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(ValidationError),
    CategoryNotFound(CategoryId),
    ArticleNotFound(ArticleId),
    CommentNotFound(CommentId),
    FlagNotFound(FlagId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            Self::CommentNotFound(id) => write!(f, "comment not found: {id}"),
            Self::FlagNotFound(id) => write!(f, "comment flag not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_count(value: i64, column: &'static str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative count `{value}` in {column}")))
}
