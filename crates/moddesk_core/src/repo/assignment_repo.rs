//! Moderator assignment repository with transactional diff-apply sync.
//!
//! # Responsibility
//! - Persist category-level and article-level moderator membership.
//! - Converge both tables to a desired membership set in one transaction.
//!
//! # Invariants
//! - Assignment rows are created/destroyed wholesale, never partially
//!   mutated.
//! - A category sync leaves every owned article's assignment rows equal to
//!   the desired set.
//! - Applying the same desired set twice is a no-op the second time.

use crate::model::content::{ArticleId, CategoryId};
use crate::model::UserId;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;

/// Membership change produced by one sync call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssignmentDiff {
    pub added: BTreeSet<UserId>,
    pub removed: BTreeSet<UserId>,
}

impl AssignmentDiff {
    /// True when the desired set already matched the stored rows.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Repository interface for moderator assignment persistence.
pub trait AssignmentRepository {
    fn category_assignees(&self, category_id: CategoryId) -> RepoResult<BTreeSet<UserId>>;
    fn article_assignees(&self, article_id: ArticleId) -> RepoResult<BTreeSet<UserId>>;

    /// Converges the category table and every owned article's rows to
    /// `desired`, atomically. Returns the applied membership change.
    fn apply_category_sync(
        &self,
        category_id: CategoryId,
        desired: &BTreeSet<UserId>,
    ) -> RepoResult<AssignmentDiff>;

    /// Converges one article's rows to `desired`, atomically, leaving every
    /// other article untouched.
    fn apply_article_sync(
        &self,
        article_id: ArticleId,
        desired: &BTreeSet<UserId>,
    ) -> RepoResult<AssignmentDiff>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn category_assignees(&self, category_id: CategoryId) -> RepoResult<BTreeSet<UserId>> {
        collect_user_ids(
            self.conn,
            "SELECT user_id FROM category_assignments WHERE category_id = ?1;",
            category_id,
        )
    }

    fn article_assignees(&self, article_id: ArticleId) -> RepoResult<BTreeSet<UserId>> {
        collect_user_ids(
            self.conn,
            "SELECT user_id FROM article_assignments WHERE article_id = ?1;",
            article_id,
        )
    }

    fn apply_category_sync(
        &self,
        category_id: CategoryId,
        desired: &BTreeSet<UserId>,
    ) -> RepoResult<AssignmentDiff> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if !exists_in_tx(&tx, "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1);", category_id)? {
            return Err(RepoError::CategoryNotFound(category_id));
        }

        let current = collect_user_ids(
            &tx,
            "SELECT user_id FROM category_assignments WHERE category_id = ?1;",
            category_id,
        )?;
        let removed: BTreeSet<UserId> = current.difference(desired).copied().collect();
        let added: BTreeSet<UserId> = desired.difference(&current).copied().collect();

        let article_ids = {
            let mut stmt =
                tx.prepare("SELECT id FROM articles WHERE category_id = ?1 ORDER BY id ASC;")?;
            let mut rows = stmt.query([category_id])?;
            let mut ids: Vec<ArticleId> = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            ids
        };

        {
            let mut delete_article_row = tx.prepare(
                "DELETE FROM article_assignments WHERE user_id = ?1 AND article_id = ?2;",
            )?;
            for user_id in &removed {
                for article_id in &article_ids {
                    delete_article_row.execute(params![user_id, article_id])?;
                }
            }
            // Clears leftovers from a prior partial run before re-inserting,
            // so the bulk insert below cannot hit a duplicate key.
            for user_id in &added {
                for article_id in &article_ids {
                    delete_article_row.execute(params![user_id, article_id])?;
                }
            }

            let mut insert_article_row = tx.prepare(
                "INSERT INTO article_assignments (user_id, article_id) VALUES (?1, ?2);",
            )?;
            for user_id in &added {
                for article_id in &article_ids {
                    insert_article_row.execute(params![user_id, article_id])?;
                }
            }

            let mut delete_category_row = tx.prepare(
                "DELETE FROM category_assignments WHERE user_id = ?1 AND category_id = ?2;",
            )?;
            for user_id in &removed {
                delete_category_row.execute(params![user_id, category_id])?;
            }

            let mut insert_category_row = tx.prepare(
                "INSERT INTO category_assignments (user_id, category_id) VALUES (?1, ?2);",
            )?;
            for user_id in &added {
                insert_category_row.execute(params![user_id, category_id])?;
            }
        }

        tx.commit()?;
        Ok(AssignmentDiff { added, removed })
    }

    fn apply_article_sync(
        &self,
        article_id: ArticleId,
        desired: &BTreeSet<UserId>,
    ) -> RepoResult<AssignmentDiff> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if !exists_in_tx(&tx, "SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?1);", article_id)? {
            return Err(RepoError::ArticleNotFound(article_id));
        }

        let current = collect_user_ids(
            &tx,
            "SELECT user_id FROM article_assignments WHERE article_id = ?1;",
            article_id,
        )?;

        // Walk current rows: already-desired users need nothing, the rest
        // are marked for deletion; whatever remains of `desired` is new.
        let mut to_add = desired.clone();
        let mut removed = BTreeSet::new();
        for user_id in &current {
            if !to_add.remove(user_id) {
                removed.insert(*user_id);
            }
        }

        {
            let mut delete_row = tx.prepare(
                "DELETE FROM article_assignments WHERE user_id = ?1 AND article_id = ?2;",
            )?;
            for user_id in &removed {
                delete_row.execute(params![user_id, article_id])?;
            }

            let mut insert_row = tx.prepare(
                "INSERT INTO article_assignments (user_id, article_id) VALUES (?1, ?2);",
            )?;
            for user_id in &to_add {
                insert_row.execute(params![user_id, article_id])?;
            }
        }

        tx.commit()?;
        Ok(AssignmentDiff {
            added: to_add,
            removed,
        })
    }
}

fn collect_user_ids(conn: &Connection, sql: &str, key: i64) -> RepoResult<BTreeSet<UserId>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key])?;
    let mut user_ids = BTreeSet::new();
    while let Some(row) = rows.next()? {
        user_ids.insert(row.get(0)?);
    }
    Ok(user_ids)
}

fn exists_in_tx(tx: &Transaction<'_>, sql: &str, id: i64) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(sql, [id], |row| row.get(0))?;
    Ok(exists == 1)
}
