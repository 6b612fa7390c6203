//! Denormalized moderation counter recompute service.
//!
//! # Responsibility
//! - Rewrite a comment's derived flag state from its authoritative flags.
//! - Re-derive article and category counter sets from child state.
//! - Signal the hub with article-scoped (partial) notifications.
//!
//! # Invariants
//! - Counters are always recomputed from scratch, never incremented.
//! - A dangling owner (missing article/category) skips that level with a
//!   warning instead of failing the whole recompute.

use crate::model::comment::{CommentId, FlagSummary};
use crate::model::content::ArticleId;
use crate::model::counters::CounterSet;
use crate::notify::NotificationHub;
use crate::repo::comment_repo::CommentRepository;
use crate::repo::content_repo::ContentRepository;
use crate::repo::RepoError;
use crate::service::flag_summary::summarize_flags;
use crate::service::ServiceResult;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Use-case service recomputing derived moderation counters.
pub struct CounterService<C: ContentRepository, M: CommentRepository> {
    content: C,
    comments: M,
    hub: Arc<NotificationHub>,
}

impl<C: ContentRepository, M: CommentRepository> CounterService<C, M> {
    pub fn new(content: C, comments: M, hub: Arc<NotificationHub>) -> Self {
        Self {
            content,
            comments,
            hub,
        }
    }

    /// Rewrites one comment's `unresolved_flags_count` and `flags_summary`
    /// from its current flag rows.
    ///
    /// Does not notify; article-level recompute owns the partial signal.
    pub fn recompute_comment(&self, comment_id: CommentId) -> ServiceResult<FlagSummary> {
        let started_at = Instant::now();

        if self.comments.get_comment(comment_id)?.is_none() {
            return Err(RepoError::CommentNotFound(comment_id).into());
        }

        let flags = self.comments.list_flags(comment_id)?;
        let summary = summarize_flags(&flags);
        let unresolved = summary.unresolved_total();
        self.comments
            .write_flag_state(comment_id, unresolved, &summary)?;

        info!(
            "event=counter_recompute module=service scope=comment status=ok comment_id={comment_id} labels={} unresolved={unresolved} duration_ms={}",
            summary.len(),
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }

    /// Re-derives one article's counter set from all of its comments; with
    /// `cascade_to_category` the owning category is likewise re-derived from
    /// all of its articles.
    ///
    /// Signals the hub with a partial scope keyed by `article_id` on
    /// completion. Comment/article level changes never warrant a global
    /// notification.
    pub fn recompute_article(
        &self,
        article_id: ArticleId,
        cascade_to_category: bool,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();

        let Some(article) = self.content.get_article(article_id)? else {
            // Dangling reference; indicates a referential-integrity bug
            // upstream, logged and skipped rather than retried.
            warn!(
                "event=counter_recompute module=service scope=article status=skipped reason=owner_missing article_id={article_id}"
            );
            return Ok(());
        };

        let comments = self.comments.list_comments(article_id)?;
        let mut counters = CounterSet::default();
        for comment in &comments {
            counters.absorb(comment);
        }
        self.content.write_article_counters(article_id, &counters)?;

        if cascade_to_category {
            if let Some(category_id) = article.category_id {
                match self.content.get_category(category_id)? {
                    Some(_) => {
                        let mut totals = CounterSet::default();
                        for article_counters in
                            self.content.article_counters_in_category(category_id)?
                        {
                            totals.add(&article_counters);
                        }
                        self.content.write_category_counters(category_id, &totals)?;
                    }
                    None => {
                        warn!(
                            "event=counter_recompute module=service scope=category status=skipped reason=owner_missing category_id={category_id}"
                        );
                    }
                }
            }
        }

        self.hub.notify_partial(article_id)?;
        info!(
            "event=counter_recompute module=service scope=article status=ok article_id={article_id} comments={} cascade={cascade_to_category} duration_ms={}",
            comments.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}
