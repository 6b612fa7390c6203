//! Category and article repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and counter-write APIs over `categories` and `articles`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call model `validate()` before SQL mutations.
//! - Counter columns are only rewritten wholesale, never incremented in SQL.

use crate::model::content::{Article, ArticleId, Category, CategoryId};
use crate::model::counters::CounterSet;
use crate::model::update::{ArticleUpdate, CategoryUpdate};
use crate::repo::{bool_to_int, parse_bool, parse_count, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    label,
    is_active,
    unprocessed,
    unmoderated,
    moderated,
    approved,
    rejected,
    deferred,
    highlighted,
    flagged,
    batched
FROM categories";

const ARTICLE_SELECT_SQL: &str = "SELECT
    id,
    category_id,
    commenting_enabled,
    auto_moderation,
    unprocessed,
    unmoderated,
    moderated,
    approved,
    rejected,
    deferred,
    highlighted,
    flagged,
    batched
FROM articles";

const COUNTER_UPDATE_SQL: &str = "unprocessed = ?1,
    unmoderated = ?2,
    moderated = ?3,
    approved = ?4,
    rejected = ?5,
    deferred = ?6,
    highlighted = ?7,
    flagged = ?8,
    batched = ?9";

/// Repository interface for category/article persistence.
pub trait ContentRepository {
    fn create_category(&self, category: &Category) -> RepoResult<CategoryId>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn update_category(&self, id: CategoryId, updates: &[CategoryUpdate]) -> RepoResult<()>;
    fn write_category_counters(&self, id: CategoryId, counters: &CounterSet) -> RepoResult<()>;

    fn create_article(&self, article: &Article) -> RepoResult<ArticleId>;
    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>>;
    fn update_article(&self, id: ArticleId, updates: &[ArticleUpdate]) -> RepoResult<()>;
    fn write_article_counters(&self, id: ArticleId, counters: &CounterSet) -> RepoResult<()>;

    /// Ids of all articles owned by `category_id`, ascending.
    fn article_ids_in_category(&self, category_id: CategoryId) -> RepoResult<Vec<ArticleId>>;
    /// Counter sets of all articles owned by `category_id`.
    fn article_counters_in_category(&self, category_id: CategoryId)
        -> RepoResult<Vec<CounterSet>>;
}

/// SQLite-backed content repository.
pub struct SqliteContentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn category_exists(&self, id: CategoryId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn article_exists(&self, id: ArticleId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl ContentRepository for SqliteContentRepository<'_> {
    fn create_category(&self, category: &Category) -> RepoResult<CategoryId> {
        category.validate()?;

        self.conn.execute(
            "INSERT INTO categories (
                id, label, is_active,
                unprocessed, unmoderated, moderated, approved, rejected,
                deferred, highlighted, flagged, batched
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                category.id,
                category.label.as_str(),
                bool_to_int(category.is_active),
                category.counters.unprocessed,
                category.counters.unmoderated,
                category.counters.moderated,
                category.counters.approved,
                category.counters.rejected,
                category.counters.deferred,
                category.counters.highlighted,
                category.counters.flagged,
                category.counters.batched,
            ],
        )?;

        Ok(category.id)
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"))?;
        let category = stmt
            .query_row([id], |row| Ok(parse_category_row(row)))
            .optional()?;
        category.transpose()
    }

    fn update_category(&self, id: CategoryId, updates: &[CategoryUpdate]) -> RepoResult<()> {
        for update in updates {
            update.validate()?;
        }
        // All variants apply in one transaction so a mid-sequence failure
        // cannot leave a partially updated row.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !self.category_exists(id)? {
            return Err(RepoError::CategoryNotFound(id));
        }

        for update in updates {
            match update {
                CategoryUpdate::Label(value) => {
                    tx.execute(
                        "UPDATE categories SET label = ?1 WHERE id = ?2;",
                        params![value.as_str(), id],
                    )?;
                }
                CategoryUpdate::Active(value) => {
                    tx.execute(
                        "UPDATE categories SET is_active = ?1 WHERE id = ?2;",
                        params![bool_to_int(*value), id],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_category_counters(&self, id: CategoryId, counters: &CounterSet) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE categories SET {COUNTER_UPDATE_SQL} WHERE id = ?10;"),
            counter_params(counters, id),
        )?;
        if changed == 0 {
            return Err(RepoError::CategoryNotFound(id));
        }
        Ok(())
    }

    fn create_article(&self, article: &Article) -> RepoResult<ArticleId> {
        article.validate()?;

        self.conn.execute(
            "INSERT INTO articles (
                id, category_id, commenting_enabled, auto_moderation,
                unprocessed, unmoderated, moderated, approved, rejected,
                deferred, highlighted, flagged, batched
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                article.id,
                article.category_id,
                bool_to_int(article.commenting_enabled),
                bool_to_int(article.auto_moderation),
                article.counters.unprocessed,
                article.counters.unmoderated,
                article.counters.moderated,
                article.counters.approved,
                article.counters.rejected,
                article.counters.deferred,
                article.counters.highlighted,
                article.counters.flagged,
                article.counters.batched,
            ],
        )?;

        Ok(article.id)
    }

    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE id = ?1;"))?;
        let article = stmt
            .query_row([id], |row| Ok(parse_article_row(row)))
            .optional()?;
        article.transpose()
    }

    fn update_article(&self, id: ArticleId, updates: &[ArticleUpdate]) -> RepoResult<()> {
        for update in updates {
            update.validate()?;
        }
        // One transaction for the whole variant list; a rejected target
        // category rolls back any variants already applied.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !self.article_exists(id)? {
            return Err(RepoError::ArticleNotFound(id));
        }

        for update in updates {
            match update {
                ArticleUpdate::Category(value) => {
                    if let Some(category_id) = value {
                        if !self.category_exists(*category_id)? {
                            return Err(RepoError::CategoryNotFound(*category_id));
                        }
                    }
                    tx.execute(
                        "UPDATE articles SET category_id = ?1 WHERE id = ?2;",
                        params![value, id],
                    )?;
                }
                ArticleUpdate::CommentingEnabled(value) => {
                    tx.execute(
                        "UPDATE articles SET commenting_enabled = ?1 WHERE id = ?2;",
                        params![bool_to_int(*value), id],
                    )?;
                }
                ArticleUpdate::AutoModeration(value) => {
                    tx.execute(
                        "UPDATE articles SET auto_moderation = ?1 WHERE id = ?2;",
                        params![bool_to_int(*value), id],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_article_counters(&self, id: ArticleId, counters: &CounterSet) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE articles SET {COUNTER_UPDATE_SQL} WHERE id = ?10;"),
            counter_params(counters, id),
        )?;
        if changed == 0 {
            return Err(RepoError::ArticleNotFound(id));
        }
        Ok(())
    }

    fn article_ids_in_category(&self, category_id: CategoryId) -> RepoResult<Vec<ArticleId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM articles WHERE category_id = ?1 ORDER BY id ASC;")?;
        let mut rows = stmt.query([category_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn article_counters_in_category(
        &self,
        category_id: CategoryId,
    ) -> RepoResult<Vec<CounterSet>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ARTICLE_SELECT_SQL} WHERE category_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([category_id])?;
        let mut counters = Vec::new();
        while let Some(row) = rows.next()? {
            counters.push(parse_counter_set(row)?);
        }
        Ok(counters)
    }
}

fn counter_params(counters: &CounterSet, id: i64) -> [i64; 10] {
    [
        i64::from(counters.unprocessed),
        i64::from(counters.unmoderated),
        i64::from(counters.moderated),
        i64::from(counters.approved),
        i64::from(counters.rejected),
        i64::from(counters.deferred),
        i64::from(counters.highlighted),
        i64::from(counters.flagged),
        i64::from(counters.batched),
        id,
    ]
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let category = Category {
        id: row.get("id")?,
        label: row.get("label")?,
        is_active: parse_bool(row.get("is_active")?, "categories.is_active")?,
        counters: parse_counter_set(row)?,
    };
    category.validate()?;
    Ok(category)
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let article = Article {
        id: row.get("id")?,
        category_id: row.get("category_id")?,
        commenting_enabled: parse_bool(
            row.get("commenting_enabled")?,
            "articles.commenting_enabled",
        )?,
        auto_moderation: parse_bool(row.get("auto_moderation")?, "articles.auto_moderation")?,
        counters: parse_counter_set(row)?,
    };
    article.validate()?;
    Ok(article)
}

fn parse_counter_set(row: &Row<'_>) -> RepoResult<CounterSet> {
    Ok(CounterSet {
        unprocessed: parse_count(row.get("unprocessed")?, "unprocessed")?,
        unmoderated: parse_count(row.get("unmoderated")?, "unmoderated")?,
        moderated: parse_count(row.get("moderated")?, "moderated")?,
        approved: parse_count(row.get("approved")?, "approved")?,
        rejected: parse_count(row.get("rejected")?, "rejected")?,
        deferred: parse_count(row.get("deferred")?, "deferred")?,
        highlighted: parse_count(row.get("highlighted")?, "highlighted")?,
        flagged: parse_count(row.get("flagged")?, "flagged")?,
        batched: parse_count(row.get("batched")?, "batched")?,
    })
}
