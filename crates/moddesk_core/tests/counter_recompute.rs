use moddesk_core::db::open_db_in_memory;
use moddesk_core::{
    Article, ArticleId, Category, Comment, CommentFlag, CommentRepository, CommentUpdate,
    ContentRepository, CounterService, InMemoryUpdateMarker, ListenerError, ModerationState,
    NotificationHub, RepoError, ServiceError, SqliteCommentRepository, SqliteContentRepository,
    UpdateListener,
};
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingListener {
    globals: AtomicUsize,
    partials: Mutex<Vec<ArticleId>>,
}

impl UpdateListener for RecordingListener {
    fn on_global_update(&self) -> Result<(), ListenerError> {
        self.globals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_partial_update(&self, article_id: ArticleId) -> Result<(), ListenerError> {
        self.partials.lock().unwrap().push(article_id);
        Ok(())
    }
}

fn test_hub() -> Arc<NotificationHub> {
    Arc::new(NotificationHub::new(
        Arc::new(InMemoryUpdateMarker::new()),
        Duration::from_secs(60),
    ))
}

fn service<'conn>(
    conn: &'conn Connection,
    hub: Arc<NotificationHub>,
) -> CounterService<SqliteContentRepository<'conn>, SqliteCommentRepository<'conn>> {
    CounterService::new(
        SqliteContentRepository::new(conn),
        SqliteCommentRepository::new(conn),
        hub,
    )
}

/// Category 1 -> article 10 -> comment 100.
fn seed(conn: &Connection) {
    let content = SqliteContentRepository::new(conn);
    content.create_category(&Category::new(1, "sports")).unwrap();
    content.create_article(&Article::new(10, Some(1))).unwrap();
    let comments = SqliteCommentRepository::new(conn);
    comments
        .create_comment(&Comment::new(100, 10, ModerationState::Unmoderated))
        .unwrap();
}

#[test]
fn comment_recompute_groups_flags_and_tracks_resolution() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let comments = SqliteCommentRepository::new(&conn);
    let service = service(&conn, test_hub());

    comments.create_flag(&CommentFlag::new(1, 100, "red")).unwrap();
    comments.create_flag(&CommentFlag::new(2, 100, "red")).unwrap();
    let mut resolved_green = CommentFlag::new(3, 100, "green");
    resolved_green.is_resolved = true;
    comments.create_flag(&resolved_green).unwrap();

    let summary = service.recompute_comment(100).unwrap();
    let red = summary.get("red").unwrap();
    assert_eq!((red.total, red.unresolved, red.recommendations), (2, 2, 0));
    let green = summary.get("green").unwrap();
    assert_eq!(
        (green.total, green.unresolved, green.recommendations),
        (1, 0, 0)
    );

    let stored = comments.get_comment(100).unwrap().unwrap();
    assert_eq!(stored.unresolved_flags_count, 2);

    comments.resolve_flag(1, Some(42)).unwrap();
    let summary = service.recompute_comment(100).unwrap();
    let red = summary.get("red").unwrap();
    assert_eq!((red.total, red.unresolved, red.recommendations), (2, 1, 0));

    let stored = comments.get_comment(100).unwrap().unwrap();
    assert_eq!(stored.unresolved_flags_count, 1);
}

#[test]
fn comment_recompute_requires_an_existing_comment() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn, test_hub());

    let err = service.recompute_comment(999).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::CommentNotFound(999))
    ));
}

#[test]
fn article_recompute_derives_counters_from_comment_state() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let comments = SqliteCommentRepository::new(&conn);
    let content = SqliteContentRepository::new(&conn);

    comments
        .create_comment(&Comment::new(101, 10, ModerationState::Accepted))
        .unwrap();
    comments
        .create_comment(&Comment::new(102, 10, ModerationState::Rejected))
        .unwrap();
    let mut scored = Comment::new(103, 10, ModerationState::Unmoderated);
    scored.is_scored = true;
    comments.create_comment(&scored).unwrap();
    comments
        .update_comment(
            101,
            &[CommentUpdate::Highlighted(true), CommentUpdate::Deferred(true)],
        )
        .unwrap();

    let service = service(&conn, test_hub());
    service.recompute_article(10, false).unwrap();

    let article = content.get_article(10).unwrap().unwrap();
    assert_eq!(article.counters.unmoderated, 2);
    assert_eq!(article.counters.unprocessed, 1);
    assert_eq!(article.counters.batched, 1);
    assert_eq!(article.counters.moderated, 2);
    assert_eq!(article.counters.approved, 1);
    assert_eq!(article.counters.rejected, 1);
    assert_eq!(article.counters.highlighted, 1);
    assert_eq!(article.counters.deferred, 1);
    assert_eq!(article.counters.flagged, 0);

    // Without cascade the category stays untouched.
    let category = content.get_category(1).unwrap().unwrap();
    assert!(category.counters.is_zero());
}

#[test]
fn cascade_sums_category_counters_over_all_articles() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let content = SqliteContentRepository::new(&conn);
    let comments = SqliteCommentRepository::new(&conn);

    content.create_article(&Article::new(20, Some(1))).unwrap();
    comments
        .create_comment(&Comment::new(200, 20, ModerationState::Accepted))
        .unwrap();
    comments
        .update_comment(100, &[CommentUpdate::State(ModerationState::Accepted)])
        .unwrap();

    let service = service(&conn, test_hub());
    service.recompute_article(10, true).unwrap();
    service.recompute_article(20, true).unwrap();

    let category = content.get_category(1).unwrap().unwrap();
    assert_eq!(category.counters.approved, 2);
    assert_eq!(category.counters.moderated, 2);
    assert_eq!(category.counters.unmoderated, 0);
}

#[test]
fn flagged_counter_follows_unresolved_flag_state() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let comments = SqliteCommentRepository::new(&conn);
    let content = SqliteContentRepository::new(&conn);
    let service = service(&conn, test_hub());

    comments.create_flag(&CommentFlag::new(1, 100, "spam")).unwrap();
    service.recompute_comment(100).unwrap();
    service.recompute_article(10, true).unwrap();

    let article = content.get_article(10).unwrap().unwrap();
    assert_eq!(article.counters.flagged, 1);
    let category = content.get_category(1).unwrap().unwrap();
    assert_eq!(category.counters.flagged, 1);

    comments.resolve_flag(1, None).unwrap();
    service.recompute_comment(100).unwrap();
    service.recompute_article(10, true).unwrap();

    let article = content.get_article(10).unwrap().unwrap();
    assert_eq!(article.counters.flagged, 0);
}

#[test]
fn article_recompute_emits_partial_notification_only() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let hub = test_hub();
    let listener = Arc::new(RecordingListener::default());
    hub.register_listener(listener.clone());
    let service = service(&conn, hub);

    service.recompute_article(10, true).unwrap();

    assert_eq!(listener.globals.load(Ordering::SeqCst), 0);
    assert_eq!(*listener.partials.lock().unwrap(), vec![10]);
}

#[test]
fn dangling_article_is_skipped_without_notification() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let hub = test_hub();
    let listener = Arc::new(RecordingListener::default());
    hub.register_listener(listener.clone());
    let service = service(&conn, hub);

    service.recompute_article(999, true).unwrap();

    assert_eq!(listener.globals.load(Ordering::SeqCst), 0);
    assert!(listener.partials.lock().unwrap().is_empty());
}

#[test]
fn uncategorized_article_recomputes_without_cascade_target() {
    let conn = open_db_in_memory().unwrap();
    let content = SqliteContentRepository::new(&conn);
    content.create_article(&Article::new(30, None)).unwrap();
    let comments = SqliteCommentRepository::new(&conn);
    comments
        .create_comment(&Comment::new(300, 30, ModerationState::Accepted))
        .unwrap();

    let service = service(&conn, test_hub());
    service.recompute_article(30, true).unwrap();

    let article = content.get_article(30).unwrap().unwrap();
    assert_eq!(article.counters.approved, 1);
}
