//! Tagged settable-attribute updates per entity kind.
//!
//! # Responsibility
//! - Replace loosely-typed attribute maps with one explicit variant per
//!   settable field.
//! - Validate each update before any persistence happens.
//!
//! # Invariants
//! - An invalid update is rejected wholesale; no partial mutation occurs.

use crate::model::comment::ModerationState;
use crate::model::content::CategoryId;
use crate::model::{require_positive_id, ValidationError};

/// Settable category attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryUpdate {
    Label(String),
    Active(bool),
}

impl CategoryUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Label(value) => {
                if value.trim().is_empty() {
                    return Err(ValidationError::EmptyLabel {
                        field: "category label",
                    });
                }
                Ok(())
            }
            Self::Active(_) => Ok(()),
        }
    }
}

/// Settable article attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleUpdate {
    /// Moves the article to another category, or detaches it with `None`.
    Category(Option<CategoryId>),
    CommentingEnabled(bool),
    AutoModeration(bool),
}

impl ArticleUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Category(Some(category_id)) => require_positive_id("category id", *category_id),
            Self::Category(None) | Self::CommentingEnabled(_) | Self::AutoModeration(_) => Ok(()),
        }
    }
}

/// Settable comment attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentUpdate {
    State(ModerationState),
    Deferred(bool),
    Highlighted(bool),
    Scored(bool),
}

impl CommentUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        // All comment updates carry already-typed values; nothing to reject.
        Ok(())
    }
}
