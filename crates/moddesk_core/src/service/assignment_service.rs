//! Moderator assignment reconciliation service.
//!
//! # Responsibility
//! - Converge assignment tables to a desired moderator set via the
//!   transactional repository primitives.
//! - Signal the hub with the correct scope: category sync is global,
//!   article sync is partial.
//!
//! # Invariants
//! - Desired user ids must be positive; they are otherwise trusted because
//!   this subsystem has no user table to validate against.
//! - An empty desired set clears all assignments.
//! - Re-applying the same desired set is a no-op.

use crate::model::content::{ArticleId, CategoryId};
use crate::model::{UserId, ValidationError};
use crate::notify::NotificationHub;
use crate::repo::assignment_repo::{AssignmentDiff, AssignmentRepository};
use crate::repo::RepoError;
use crate::service::ServiceResult;
use log::info;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Use-case service reconciling moderator assignments.
pub struct AssignmentService<A: AssignmentRepository> {
    repo: A,
    hub: Arc<NotificationHub>,
}

impl<A: AssignmentRepository> AssignmentService<A> {
    pub fn new(repo: A, hub: Arc<NotificationHub>) -> Self {
        Self { repo, hub }
    }

    /// Converges the category-level table and every owned article's rows to
    /// `desired`, then signals a global update.
    ///
    /// The blast radius of a category-wide change spans every article in the
    /// category, so listeners must refresh fully.
    pub fn sync_category_assignments(
        &self,
        category_id: CategoryId,
        desired: &BTreeSet<UserId>,
    ) -> ServiceResult<AssignmentDiff> {
        let started_at = Instant::now();
        validate_id("category id", category_id)?;
        validate_user_ids(desired)?;

        let diff = self.repo.apply_category_sync(category_id, desired)?;
        self.hub.notify_global()?;

        info!(
            "event=assignment_sync module=service scope=category status=ok category_id={category_id} desired={} added={} removed={} duration_ms={}",
            desired.len(),
            diff.added.len(),
            diff.removed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(diff)
    }

    /// Converges one article's assignment rows to `desired`, then signals a
    /// partial update keyed by the article id.
    pub fn sync_article_assignments(
        &self,
        article_id: ArticleId,
        desired: &BTreeSet<UserId>,
    ) -> ServiceResult<AssignmentDiff> {
        let started_at = Instant::now();
        validate_id("article id", article_id)?;
        validate_user_ids(desired)?;

        let diff = self.repo.apply_article_sync(article_id, desired)?;
        self.hub.notify_partial(article_id)?;

        info!(
            "event=assignment_sync module=service scope=article status=ok article_id={article_id} desired={} added={} removed={} duration_ms={}",
            desired.len(),
            diff.added.len(),
            diff.removed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(diff)
    }
}

fn validate_id(field: &'static str, value: i64) -> Result<(), RepoError> {
    if value <= 0 {
        return Err(RepoError::Validation(ValidationError::NonPositiveId {
            field,
            value,
        }));
    }
    Ok(())
}

fn validate_user_ids(user_ids: &BTreeSet<UserId>) -> Result<(), RepoError> {
    for user_id in user_ids {
        validate_id("user id", *user_id)?;
    }
    Ok(())
}
