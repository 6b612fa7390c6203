//! Comment and comment-flag domain model.
//!
//! # Responsibility
//! - Define the comment moderation record and its flag records.
//! - Define the per-label flag summary and its consistency rules.
//!
//! # Invariants
//! - `flags_summary[label].total >= flags_summary[label].unresolved`.
//! - `unresolved_flags_count` equals the sum of unresolved counts across all
//!   summary labels.
//! - Flag labels match `[a-z][a-z0-9_]*`.

use crate::model::content::ArticleId;
use crate::model::{require_positive_id, UserId, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Stable identifier for a comment.
pub type CommentId = i64;

/// Stable identifier for a comment flag.
pub type FlagId = i64;

static FLAG_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid flag label regex"));

/// Moderation decision state of a comment.
///
/// `deferred` and `highlighted` are orthogonal boolean states on [`Comment`],
/// not part of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    Unmoderated,
    Accepted,
    Rejected,
}

/// Per-label flag counts: `[total, unresolved, recommendationCount]`.
///
/// Serialized as a 3-element array to keep the persisted summary shape stable
/// for external consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "(u32, u32, u32)", into = "(u32, u32, u32)")]
pub struct LabelCounts {
    pub total: u32,
    pub unresolved: u32,
    pub recommendations: u32,
}

impl From<(u32, u32, u32)> for LabelCounts {
    fn from(value: (u32, u32, u32)) -> Self {
        Self {
            total: value.0,
            unresolved: value.1,
            recommendations: value.2,
        }
    }
}

impl From<LabelCounts> for (u32, u32, u32) {
    fn from(value: LabelCounts) -> Self {
        (value.total, value.unresolved, value.recommendations)
    }
}

/// Mapping from flag label to its [`LabelCounts`] tuple.
///
/// Backed by a `BTreeMap` so serialization and iteration order stay
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSummary {
    entries: BTreeMap<String, LabelCounts>,
}

impl FlagSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, label: &str) -> Option<LabelCounts> {
        self.entries.get(label).copied()
    }

    /// Replaces the counts for one label.
    pub fn insert(&mut self, label: impl Into<String>, counts: LabelCounts) {
        self.entries.insert(label.into(), counts);
    }

    /// Returns mutable counts for a label, inserting zeroes when absent.
    pub fn entry_mut(&mut self, label: &str) -> &mut LabelCounts {
        match self.entries.entry(label.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(LabelCounts::default()),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Sum of the unresolved count across all labels.
    pub fn unresolved_total(&self) -> u32 {
        self.entries.values().map(|counts| counts.unresolved).sum()
    }

    /// Checks label grammar and per-label count consistency.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (label, counts) in &self.entries {
            if !is_valid_flag_label(label) {
                return Err(ValidationError::InvalidFlagLabel {
                    label: label.clone(),
                });
            }
            if counts.unresolved > counts.total {
                return Err(ValidationError::SummaryCountExceedsTotal {
                    label: label.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Comment moderation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub state: ModerationState,
    /// Set aside for a later decision; orthogonal to `state`.
    pub is_deferred: bool,
    /// Editorially highlighted; orthogonal to `state`.
    pub is_highlighted: bool,
    /// Whether the automated batch pipeline has scored this comment.
    pub is_scored: bool,
    /// Derived; equals `flags_summary.unresolved_total()` after recompute.
    pub unresolved_flags_count: u32,
    /// Derived per-label flag counts, recomputed wholesale on flag changes.
    pub flags_summary: FlagSummary,
}

impl Comment {
    pub fn new(id: CommentId, article_id: ArticleId, state: ModerationState) -> Self {
        Self {
            id,
            article_id,
            state,
            is_deferred: false,
            is_highlighted: false,
            is_scored: false,
            unresolved_flags_count: 0,
            flags_summary: FlagSummary::new(),
        }
    }

    /// Validates ids and summary consistency before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive_id("comment id", self.id)?;
        require_positive_id("article id", self.article_id)?;
        self.flags_summary.validate()?;

        let expected = self.flags_summary.unresolved_total();
        if expected != self.unresolved_flags_count {
            return Err(ValidationError::UnresolvedCountMismatch {
                expected,
                actual: self.unresolved_flags_count,
            });
        }
        Ok(())
    }
}

/// One flag raised against a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentFlag {
    pub id: FlagId,
    pub comment_id: CommentId,
    pub label: String,
    pub is_resolved: bool,
    pub resolved_by_id: Option<UserId>,
    /// Flags that recommend the comment instead of reporting it.
    pub is_recommendation: bool,
}

impl CommentFlag {
    pub fn new(id: FlagId, comment_id: CommentId, label: impl Into<String>) -> Self {
        Self {
            id,
            comment_id,
            label: label.into(),
            is_resolved: false,
            resolved_by_id: None,
            is_recommendation: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_positive_id("flag id", self.id)?;
        require_positive_id("comment id", self.comment_id)?;
        if !is_valid_flag_label(&self.label) {
            return Err(ValidationError::InvalidFlagLabel {
                label: self.label.clone(),
            });
        }
        if let Some(user_id) = self.resolved_by_id {
            require_positive_id("resolved_by id", user_id)?;
        }
        Ok(())
    }
}

/// Returns whether `value` is an acceptable flag label.
pub fn is_valid_flag_label(value: &str) -> bool {
    FLAG_LABEL_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::{
        is_valid_flag_label, Comment, CommentFlag, FlagSummary, LabelCounts, ModerationState,
    };
    use crate::model::ValidationError;

    #[test]
    fn flag_label_grammar() {
        assert!(is_valid_flag_label("spam"));
        assert!(is_valid_flag_label("off_topic2"));
        assert!(!is_valid_flag_label(""));
        assert!(!is_valid_flag_label("Spam"));
        assert!(!is_valid_flag_label("2fast"));
        assert!(!is_valid_flag_label("has space"));
    }

    #[test]
    fn label_counts_serialize_as_tuple() {
        let counts = LabelCounts {
            total: 2,
            unresolved: 1,
            recommendations: 0,
        };
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, "[2,1,0]");

        let back: LabelCounts = serde_json::from_str("[3,2,1]").unwrap();
        assert_eq!(back.total, 3);
        assert_eq!(back.unresolved, 2);
        assert_eq!(back.recommendations, 1);
    }

    #[test]
    fn summary_rejects_unresolved_above_total() {
        let mut summary = FlagSummary::new();
        summary.insert(
            "spam",
            LabelCounts {
                total: 1,
                unresolved: 2,
                recommendations: 0,
            },
        );
        assert!(matches!(
            summary.validate(),
            Err(ValidationError::SummaryCountExceedsTotal { .. })
        ));
    }

    #[test]
    fn comment_validate_requires_matching_unresolved_count() {
        let mut comment = Comment::new(1, 1, ModerationState::Unmoderated);
        comment.flags_summary.insert(
            "spam",
            LabelCounts {
                total: 2,
                unresolved: 2,
                recommendations: 0,
            },
        );
        comment.unresolved_flags_count = 1;

        assert!(matches!(
            comment.validate(),
            Err(ValidationError::UnresolvedCountMismatch {
                expected: 2,
                actual: 1
            })
        ));

        comment.unresolved_flags_count = 2;
        comment.validate().unwrap();
    }

    #[test]
    fn flag_validate_rejects_bad_label_and_ids() {
        let flag = CommentFlag::new(1, 1, "Not Valid");
        assert!(matches!(
            flag.validate(),
            Err(ValidationError::InvalidFlagLabel { .. })
        ));

        let flag = CommentFlag::new(0, 1, "spam");
        assert!(matches!(
            flag.validate(),
            Err(ValidationError::NonPositiveId { .. })
        ));
    }
}
