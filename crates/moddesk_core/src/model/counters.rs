//! Derived moderation counters attached to articles and categories.
//!
//! # Responsibility
//! - Define the fixed counter bundle and how one comment contributes to it.
//! - Keep the counter predicates in a single place so article and category
//!   recomputes cannot drift apart.
//!
//! # Invariants
//! - Counters are recomputed from authoritative comment state, never
//!   incremented blindly.
//! - A category counter set equals the element-wise sum over its articles.

use crate::model::comment::{Comment, ModerationState};
use serde::{Deserialize, Serialize};

/// Fixed bundle of derived moderation-state counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterSet {
    /// Unmoderated comments that have not been scored yet.
    pub unprocessed: u32,
    /// Comments without a moderation decision.
    pub unmoderated: u32,
    /// Comments with a decision (accepted or rejected).
    pub moderated: u32,
    pub approved: u32,
    pub rejected: u32,
    pub deferred: u32,
    pub highlighted: u32,
    /// Comments carrying at least one unresolved flag.
    pub flagged: u32,
    /// Unmoderated comments already scored by the automated batch pipeline.
    pub batched: u32,
}

impl CounterSet {
    /// Adds one comment's contribution to this counter set.
    ///
    /// This is the single definition of every counter predicate; article
    /// recomputes fold all comments through it.
    pub fn absorb(&mut self, comment: &Comment) {
        match comment.state {
            ModerationState::Unmoderated => {
                self.unmoderated += 1;
                if comment.is_scored {
                    self.batched += 1;
                } else {
                    self.unprocessed += 1;
                }
            }
            ModerationState::Accepted => {
                self.moderated += 1;
                self.approved += 1;
            }
            ModerationState::Rejected => {
                self.moderated += 1;
                self.rejected += 1;
            }
        }

        if comment.is_deferred {
            self.deferred += 1;
        }
        if comment.is_highlighted {
            self.highlighted += 1;
        }
        if comment.unresolved_flags_count > 0 {
            self.flagged += 1;
        }
    }

    /// Element-wise sum, used when re-deriving a category from its articles.
    pub fn add(&mut self, other: &CounterSet) {
        self.unprocessed += other.unprocessed;
        self.unmoderated += other.unmoderated;
        self.moderated += other.moderated;
        self.approved += other.approved;
        self.rejected += other.rejected;
        self.deferred += other.deferred;
        self.highlighted += other.highlighted;
        self.flagged += other.flagged;
        self.batched += other.batched;
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::CounterSet;
    use crate::model::comment::{Comment, ModerationState};

    fn comment(state: ModerationState) -> Comment {
        Comment::new(1, 1, state)
    }

    #[test]
    fn absorb_splits_unmoderated_by_scoring() {
        let mut counters = CounterSet::default();

        counters.absorb(&comment(ModerationState::Unmoderated));

        let mut scored = comment(ModerationState::Unmoderated);
        scored.is_scored = true;
        counters.absorb(&scored);

        assert_eq!(counters.unmoderated, 2);
        assert_eq!(counters.unprocessed, 1);
        assert_eq!(counters.batched, 1);
        assert_eq!(counters.moderated, 0);
    }

    #[test]
    fn absorb_counts_decisions_and_orthogonal_states() {
        let mut counters = CounterSet::default();

        let mut accepted = comment(ModerationState::Accepted);
        accepted.is_highlighted = true;
        counters.absorb(&accepted);

        let mut rejected = comment(ModerationState::Rejected);
        rejected.is_deferred = true;
        rejected.unresolved_flags_count = 2;
        counters.absorb(&rejected);

        assert_eq!(counters.moderated, 2);
        assert_eq!(counters.approved, 1);
        assert_eq!(counters.rejected, 1);
        assert_eq!(counters.highlighted, 1);
        assert_eq!(counters.deferred, 1);
        assert_eq!(counters.flagged, 1);
    }

    #[test]
    fn add_is_element_wise() {
        let mut left = CounterSet {
            approved: 2,
            flagged: 1,
            ..CounterSet::default()
        };
        let right = CounterSet {
            approved: 3,
            rejected: 1,
            ..CounterSet::default()
        };

        left.add(&right);
        assert_eq!(left.approved, 5);
        assert_eq!(left.rejected, 1);
        assert_eq!(left.flagged, 1);
        assert!(!left.is_zero());
    }
}
