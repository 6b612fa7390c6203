//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Signal the notification hub with the correct scope after each change.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Counter recomputes derive from authoritative child state, never from
//!   previous counter values.

use crate::notify::NotifyError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod assignment_service;
pub mod counter_service;
pub mod flag_summary;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error raised by use-case services.
#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    Notify(NotifyError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Notify(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Notify(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<NotifyError> for ServiceError {
    fn from(value: NotifyError) -> Self {
        Self::Notify(value)
    }
}
