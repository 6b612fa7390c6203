//! Category and article domain model.
//!
//! # Responsibility
//! - Define the two upper levels of the moderation hierarchy.
//! - Carry the derived [`CounterSet`] for each level.
//!
//! # Invariants
//! - An article belongs to at most one category.
//! - Counter sets on both levels are derived, never edited directly.

use crate::model::counters::CounterSet;
use crate::model::{require_positive_id, ValidationError};
use serde::{Deserialize, Serialize};

/// Stable identifier for a category.
pub type CategoryId = i64;

/// Stable identifier for an article.
pub type ArticleId = i64;

/// Top level of the moderation hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub label: String,
    pub is_active: bool,
    /// Element-wise sum of all owned article counter sets.
    pub counters: CounterSet,
}

impl Category {
    pub fn new(id: CategoryId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            is_active: true,
            counters: CounterSet::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive_id("category id", self.id)?;
        if self.label.trim().is_empty() {
            return Err(ValidationError::EmptyLabel {
                field: "category label",
            });
        }
        Ok(())
    }
}

/// Middle level of the moderation hierarchy; owns comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    /// Owning category; `None` for uncategorized articles.
    pub category_id: Option<CategoryId>,
    pub commenting_enabled: bool,
    pub auto_moderation: bool,
    pub counters: CounterSet,
}

impl Article {
    pub fn new(id: ArticleId, category_id: Option<CategoryId>) -> Self {
        Self {
            id,
            category_id,
            commenting_enabled: true,
            auto_moderation: false,
            counters: CounterSet::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive_id("article id", self.id)?;
        if let Some(category_id) = self.category_id {
            require_positive_id("category id", category_id)?;
        }
        Ok(())
    }
}
