//! Moderation consistency and change-notification core.
//! This crate is the single source of truth for the counter, assignment and
//! notification invariants of the moderation backend.

pub mod api;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use api::{
    assign_article_moderators, assign_category_moderators, ApiResponse, ApiStatus,
    ArticleAssignmentRequest, CategoryAssignmentRequest, IdValue,
};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::comment::{
    Comment, CommentFlag, CommentId, FlagId, FlagSummary, LabelCounts, ModerationState,
};
pub use model::content::{Article, ArticleId, Category, CategoryId};
pub use model::counters::CounterSet;
pub use model::update::{ArticleUpdate, CategoryUpdate, CommentUpdate};
pub use model::{UserId, ValidationError};
pub use notify::{
    DeliveryReport, InMemoryUpdateMarker, ListenerError, NotificationHub, NotifyError,
    SqliteUpdateMarker, UpdateListener, UpdateMarker,
};
pub use repo::assignment_repo::{
    AssignmentDiff, AssignmentRepository, SqliteAssignmentRepository,
};
pub use repo::comment_repo::{CommentRepository, SqliteCommentRepository};
pub use repo::content_repo::{ContentRepository, SqliteContentRepository};
pub use repo::{RepoError, RepoResult};
pub use service::assignment_service::AssignmentService;
pub use service::counter_service::CounterService;
pub use service::flag_summary::summarize_flags;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
