//! Comment and comment-flag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `comments` and `comment_flags`.
//! - Persist the derived flag summary as a JSON column.
//!
//! # Invariants
//! - Persisted comment rows are always self-consistent: the stored
//!   `unresolved_flags_count` matches the stored summary.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::comment::{Comment, CommentFlag, CommentId, FlagId, FlagSummary, ModerationState};
use crate::model::content::ArticleId;
use crate::model::update::CommentUpdate;
use crate::model::{UserId, ValidationError};
use crate::repo::{bool_to_int, parse_bool, parse_count, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    article_id,
    state,
    is_deferred,
    is_highlighted,
    is_scored,
    unresolved_flags_count,
    flags_summary
FROM comments";

const FLAG_SELECT_SQL: &str = "SELECT
    id,
    comment_id,
    label,
    is_resolved,
    resolved_by_id,
    is_recommendation
FROM comment_flags";

/// Repository interface for comment and flag persistence.
pub trait CommentRepository {
    fn create_comment(&self, comment: &Comment) -> RepoResult<CommentId>;
    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>>;
    fn update_comment(&self, id: CommentId, updates: &[CommentUpdate]) -> RepoResult<()>;
    /// All comments of one article, ascending by id.
    fn list_comments(&self, article_id: ArticleId) -> RepoResult<Vec<Comment>>;
    /// Rewrites the derived flag state of one comment wholesale.
    fn write_flag_state(
        &self,
        id: CommentId,
        unresolved: u32,
        summary: &FlagSummary,
    ) -> RepoResult<()>;

    fn create_flag(&self, flag: &CommentFlag) -> RepoResult<FlagId>;
    fn resolve_flag(&self, id: FlagId, resolved_by: Option<UserId>) -> RepoResult<()>;
    /// All flags of one comment, ascending by id.
    fn list_flags(&self, comment_id: CommentId) -> RepoResult<Vec<CommentFlag>>;
}

/// SQLite-backed comment repository.
pub struct SqliteCommentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn comment_exists(&self, id: CommentId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl CommentRepository for SqliteCommentRepository<'_> {
    fn create_comment(&self, comment: &Comment) -> RepoResult<CommentId> {
        comment.validate()?;

        self.conn.execute(
            "INSERT INTO comments (
                id, article_id, state, is_deferred, is_highlighted, is_scored,
                unresolved_flags_count, flags_summary
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                comment.id,
                comment.article_id,
                state_to_db(comment.state),
                bool_to_int(comment.is_deferred),
                bool_to_int(comment.is_highlighted),
                bool_to_int(comment.is_scored),
                comment.unresolved_flags_count,
                summary_to_json(&comment.flags_summary)?,
            ],
        )?;

        Ok(comment.id)
    }

    fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COMMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let comment = stmt
            .query_row([id], |row| Ok(parse_comment_row(row)))
            .optional()?;
        comment.transpose()
    }

    fn update_comment(&self, id: CommentId, updates: &[CommentUpdate]) -> RepoResult<()> {
        for update in updates {
            update.validate()?;
        }
        // All variants apply in one transaction so a mid-sequence failure
        // cannot leave a partially updated row.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !self.comment_exists(id)? {
            return Err(RepoError::CommentNotFound(id));
        }

        for update in updates {
            match update {
                CommentUpdate::State(value) => {
                    tx.execute(
                        "UPDATE comments SET state = ?1 WHERE id = ?2;",
                        params![state_to_db(*value), id],
                    )?;
                }
                CommentUpdate::Deferred(value) => {
                    tx.execute(
                        "UPDATE comments SET is_deferred = ?1 WHERE id = ?2;",
                        params![bool_to_int(*value), id],
                    )?;
                }
                CommentUpdate::Highlighted(value) => {
                    tx.execute(
                        "UPDATE comments SET is_highlighted = ?1 WHERE id = ?2;",
                        params![bool_to_int(*value), id],
                    )?;
                }
                CommentUpdate::Scored(value) => {
                    tx.execute(
                        "UPDATE comments SET is_scored = ?1 WHERE id = ?2;",
                        params![bool_to_int(*value), id],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_comments(&self, article_id: ArticleId) -> RepoResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMMENT_SELECT_SQL} WHERE article_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([article_id])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(parse_comment_row(row)?);
        }
        Ok(comments)
    }

    fn write_flag_state(
        &self,
        id: CommentId,
        unresolved: u32,
        summary: &FlagSummary,
    ) -> RepoResult<()> {
        summary.validate()?;
        let expected = summary.unresolved_total();
        if expected != unresolved {
            return Err(RepoError::Validation(
                ValidationError::UnresolvedCountMismatch {
                    expected,
                    actual: unresolved,
                },
            ));
        }

        let changed = self.conn.execute(
            "UPDATE comments SET unresolved_flags_count = ?1, flags_summary = ?2 WHERE id = ?3;",
            params![unresolved, summary_to_json(summary)?, id],
        )?;
        if changed == 0 {
            return Err(RepoError::CommentNotFound(id));
        }
        Ok(())
    }

    fn create_flag(&self, flag: &CommentFlag) -> RepoResult<FlagId> {
        flag.validate()?;
        if !self.comment_exists(flag.comment_id)? {
            return Err(RepoError::CommentNotFound(flag.comment_id));
        }

        self.conn.execute(
            "INSERT INTO comment_flags (
                id, comment_id, label, is_resolved, resolved_by_id, is_recommendation
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                flag.id,
                flag.comment_id,
                flag.label.as_str(),
                bool_to_int(flag.is_resolved),
                flag.resolved_by_id,
                bool_to_int(flag.is_recommendation),
            ],
        )?;

        Ok(flag.id)
    }

    fn resolve_flag(&self, id: FlagId, resolved_by: Option<UserId>) -> RepoResult<()> {
        if let Some(user_id) = resolved_by {
            if user_id <= 0 {
                return Err(RepoError::Validation(ValidationError::NonPositiveId {
                    field: "resolved_by id",
                    value: user_id,
                }));
            }
        }

        let changed = self.conn.execute(
            "UPDATE comment_flags SET is_resolved = 1, resolved_by_id = ?1 WHERE id = ?2;",
            params![resolved_by, id],
        )?;
        if changed == 0 {
            return Err(RepoError::FlagNotFound(id));
        }
        Ok(())
    }

    fn list_flags(&self, comment_id: CommentId) -> RepoResult<Vec<CommentFlag>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FLAG_SELECT_SQL} WHERE comment_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([comment_id])?;
        let mut flags = Vec::new();
        while let Some(row) = rows.next()? {
            flags.push(parse_flag_row(row)?);
        }
        Ok(flags)
    }
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let state_text: String = row.get("state")?;
    let state = parse_state(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid moderation state `{state_text}` in comments.state"
        ))
    })?;

    let summary_json: String = row.get("flags_summary")?;
    let flags_summary: FlagSummary = serde_json::from_str(&summary_json).map_err(|err| {
        RepoError::InvalidData(format!("invalid comments.flags_summary json: {err}"))
    })?;

    let comment = Comment {
        id: row.get("id")?,
        article_id: row.get("article_id")?,
        state,
        is_deferred: parse_bool(row.get("is_deferred")?, "comments.is_deferred")?,
        is_highlighted: parse_bool(row.get("is_highlighted")?, "comments.is_highlighted")?,
        is_scored: parse_bool(row.get("is_scored")?, "comments.is_scored")?,
        unresolved_flags_count: parse_count(
            row.get("unresolved_flags_count")?,
            "comments.unresolved_flags_count",
        )?,
        flags_summary,
    };
    comment.validate()?;
    Ok(comment)
}

fn parse_flag_row(row: &Row<'_>) -> RepoResult<CommentFlag> {
    let flag = CommentFlag {
        id: row.get("id")?,
        comment_id: row.get("comment_id")?,
        label: row.get("label")?,
        is_resolved: parse_bool(row.get("is_resolved")?, "comment_flags.is_resolved")?,
        resolved_by_id: row.get("resolved_by_id")?,
        is_recommendation: parse_bool(
            row.get("is_recommendation")?,
            "comment_flags.is_recommendation",
        )?,
    };
    flag.validate()?;
    Ok(flag)
}

fn summary_to_json(summary: &FlagSummary) -> RepoResult<String> {
    serde_json::to_string(summary)
        .map_err(|err| RepoError::InvalidData(format!("cannot serialize flag summary: {err}")))
}

fn state_to_db(state: ModerationState) -> &'static str {
    match state {
        ModerationState::Unmoderated => "unmoderated",
        ModerationState::Accepted => "accepted",
        ModerationState::Rejected => "rejected",
    }
}

fn parse_state(value: &str) -> Option<ModerationState> {
    match value {
        "unmoderated" => Some(ModerationState::Unmoderated),
        "accepted" => Some(ModerationState::Accepted),
        "rejected" => Some(ModerationState::Rejected),
        _ => None,
    }
}
