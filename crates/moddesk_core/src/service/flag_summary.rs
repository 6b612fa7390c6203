//! Per-comment flag summary recompute.
//!
//! # Responsibility
//! - Derive the label -> `[total, unresolved, recommendationCount]` mapping
//!   from a comment's authoritative flag rows.
//!
//! # Invariants
//! - The summary is rebuilt wholesale on every call; no incremental
//!   per-label counters are maintained, so concurrent flag resolutions can
//!   never leave the summary drifted.

use crate::model::comment::{CommentFlag, FlagSummary};

/// Groups `flags` by label and counts totals, unresolved entries and
/// recommendations per label.
pub fn summarize_flags(flags: &[CommentFlag]) -> FlagSummary {
    let mut summary = FlagSummary::new();
    for flag in flags {
        let counts = summary.entry_mut(&flag.label);
        counts.total += 1;
        if !flag.is_resolved {
            counts.unresolved += 1;
        }
        if flag.is_recommendation {
            counts.recommendations += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::summarize_flags;
    use crate::model::comment::CommentFlag;

    fn flag(id: i64, label: &str, resolved: bool, recommendation: bool) -> CommentFlag {
        CommentFlag {
            is_resolved: resolved,
            is_recommendation: recommendation,
            ..CommentFlag::new(id, 1, label)
        }
    }

    #[test]
    fn groups_by_label_and_counts_each_dimension() {
        let flags = vec![
            flag(1, "red", false, false),
            flag(2, "red", false, false),
            flag(3, "green", true, false),
            flag(4, "praise", false, true),
        ];

        let summary = summarize_flags(&flags);
        assert_eq!(summary.len(), 3);

        let red = summary.get("red").unwrap();
        assert_eq!((red.total, red.unresolved, red.recommendations), (2, 2, 0));

        let green = summary.get("green").unwrap();
        assert_eq!(
            (green.total, green.unresolved, green.recommendations),
            (1, 0, 0)
        );

        let praise = summary.get("praise").unwrap();
        assert_eq!(
            (praise.total, praise.unresolved, praise.recommendations),
            (1, 1, 1)
        );

        assert_eq!(summary.unresolved_total(), 3);
    }

    #[test]
    fn empty_flag_list_yields_empty_summary() {
        let summary = summarize_flags(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary.unresolved_total(), 0);
    }
}
