//! Domain model for the moderation hierarchy.
//!
//! # Responsibility
//! - Define canonical data structures for categories, articles, comments and
//!   their flags.
//! - Enforce model-level invariants through explicit `validate()` functions.
//!
//! # Invariants
//! - Every entity is identified by a stable positive numeric id.
//! - Counter sets are derived from comment state, never authoritative.
//! - Per-label flag totals are always >= their unresolved portion.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod comment;
pub mod content;
pub mod counters;
pub mod update;

/// Stable identifier for a moderator account referenced by assignments.
///
/// The moderation subsystem holds no user table of its own; user ids are
/// opaque positive integers owned by the surrounding platform.
pub type UserId = i64;

/// Model-level validation failure.
///
/// Raised before any persistence happens; a validation error never leaves
/// partially mutated state behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NonPositiveId { field: &'static str, value: i64 },
    NonNumericId { field: &'static str, value: String },
    EmptyLabel { field: &'static str },
    InvalidFlagLabel { label: String },
    SummaryCountExceedsTotal { label: String },
    UnresolvedCountMismatch { expected: u32, actual: u32 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveId { field, value } => {
                write!(f, "{field} must be a positive id, got {value}")
            }
            Self::NonNumericId { field, value } => {
                write!(f, "{field} must be numeric, got `{value}`")
            }
            Self::EmptyLabel { field } => write!(f, "{field} must not be empty"),
            Self::InvalidFlagLabel { label } => write!(f, "invalid flag label `{label}`"),
            Self::SummaryCountExceedsTotal { label } => write!(
                f,
                "flag summary for `{label}` has more unresolved entries than total"
            ),
            Self::UnresolvedCountMismatch { expected, actual } => write!(
                f,
                "unresolved flag count {actual} does not match summary total {expected}"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Rejects zero and negative entity ids.
pub(crate) fn require_positive_id(field: &'static str, value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositiveId { field, value });
    }
    Ok(())
}
