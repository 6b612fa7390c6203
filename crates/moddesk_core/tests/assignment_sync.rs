use moddesk_core::db::open_db_in_memory;
use moddesk_core::{
    Article, ArticleId, AssignmentRepository, AssignmentService, Category, ContentRepository,
    InMemoryUpdateMarker, ListenerError, NotificationHub, RepoError, ServiceError,
    SqliteAssignmentRepository, SqliteContentRepository, UpdateListener, ValidationError,
};
use rusqlite::Connection;
use std::collections::BTreeSet;
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

/// Category 1 with articles 10 and 20.
fn seed_content(conn: &Connection) {
    let content = SqliteContentRepository::new(conn);
    content.create_category(&Category::new(1, "politics")).unwrap();
    content.create_article(&Article::new(10, Some(1))).unwrap();
    content.create_article(&Article::new(20, Some(1))).unwrap();
}

fn users(ids: &[i64]) -> BTreeSet<i64> {
    ids.iter().copied().collect()
}

#[test]
fn category_sync_converges_both_tables() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let repo = SqliteAssignmentRepository::new(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    service.sync_category_assignments(1, &users(&[1, 2])).unwrap();

    assert_eq!(repo.category_assignees(1).unwrap(), users(&[1, 2]));
    assert_eq!(repo.article_assignees(10).unwrap(), users(&[1, 2]));
    assert_eq!(repo.article_assignees(20).unwrap(), users(&[1, 2]));
}

#[test]
fn category_sync_twice_is_a_noop_the_second_time() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let repo = SqliteAssignmentRepository::new(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    let first = service.sync_category_assignments(1, &users(&[1, 2])).unwrap();
    assert_eq!(first.added, users(&[1, 2]));
    assert!(first.removed.is_empty());

    let second = service.sync_category_assignments(1, &users(&[1, 2])).unwrap();
    assert!(second.is_noop());

    assert_eq!(repo.category_assignees(1).unwrap(), users(&[1, 2]));
    assert_eq!(repo.article_assignees(10).unwrap(), users(&[1, 2]));
    assert_eq!(row_count(&conn, "article_assignments"), 4);
    assert_eq!(row_count(&conn, "category_assignments"), 2);
}

#[test]
fn category_sync_moves_membership_with_set_difference() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let repo = SqliteAssignmentRepository::new(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    service.sync_category_assignments(1, &users(&[1, 2])).unwrap();
    let diff = service.sync_category_assignments(1, &users(&[2, 3])).unwrap();

    assert_eq!(diff.added, users(&[3]));
    assert_eq!(diff.removed, users(&[1]));
    assert_eq!(repo.category_assignees(1).unwrap(), users(&[2, 3]));
    assert_eq!(repo.article_assignees(10).unwrap(), users(&[2, 3]));
    assert_eq!(repo.article_assignees(20).unwrap(), users(&[2, 3]));
}

#[test]
fn empty_desired_set_clears_all_assignments() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    service.sync_category_assignments(1, &users(&[1])).unwrap();
    assert_eq!(row_count(&conn, "category_assignments"), 1);
    assert_eq!(row_count(&conn, "article_assignments"), 2);

    service.sync_category_assignments(1, &users(&[])).unwrap();
    assert_eq!(row_count(&conn, "category_assignments"), 0);
    assert_eq!(row_count(&conn, "article_assignments"), 0);
}

#[test]
fn single_article_category_scenario() {
    let conn = open_db_in_memory().unwrap();
    let content = SqliteContentRepository::new(&conn);
    content.create_category(&Category::new(1, "culture")).unwrap();
    content.create_article(&Article::new(10, Some(1))).unwrap();
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    service.sync_category_assignments(1, &users(&[7])).unwrap();
    assert_eq!(row_count(&conn, "category_assignments"), 1);
    assert_eq!(row_count(&conn, "article_assignments"), 1);

    service.sync_category_assignments(1, &users(&[])).unwrap();
    assert_eq!(row_count(&conn, "category_assignments"), 0);
    assert_eq!(row_count(&conn, "article_assignments"), 0);
}

#[test]
fn article_sync_is_scoped_to_one_article() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let repo = SqliteAssignmentRepository::new(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    service.sync_category_assignments(1, &users(&[1])).unwrap();
    service.sync_article_assignments(10, &users(&[2])).unwrap();

    assert_eq!(repo.article_assignees(10).unwrap(), users(&[2]));
    // Sibling article and the category table are untouched.
    assert_eq!(repo.article_assignees(20).unwrap(), users(&[1]));
    assert_eq!(repo.category_assignees(1).unwrap(), users(&[1]));
}

#[test]
fn category_sync_tolerates_preexisting_article_rows() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let repo = SqliteAssignmentRepository::new(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    // A direct per-article call left a row the category cascade will also
    // want to create; the sync must not hit a duplicate key.
    service.sync_article_assignments(10, &users(&[7])).unwrap();
    service.sync_category_assignments(1, &users(&[7])).unwrap();

    assert_eq!(repo.article_assignees(10).unwrap(), users(&[7]));
    assert_eq!(repo.article_assignees(20).unwrap(), users(&[7]));
    assert_eq!(row_count(&conn, "article_assignments"), 2);
}

#[test]
fn category_sync_signals_global_and_article_sync_signals_partial() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let hub = test_hub();
    let listener = Arc::new(RecordingListener::default());
    hub.register_listener(listener.clone());
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), hub);

    service.sync_category_assignments(1, &users(&[1])).unwrap();
    assert_eq!(listener.globals.load(Ordering::SeqCst), 1);
    assert!(listener.partials.lock().unwrap().is_empty());

    service.sync_article_assignments(20, &users(&[1, 2])).unwrap();
    assert_eq!(listener.globals.load(Ordering::SeqCst), 1);
    assert_eq!(*listener.partials.lock().unwrap(), vec![20]);
}

#[test]
fn unknown_ids_are_rejected_before_any_mutation() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    let err = service
        .sync_category_assignments(99, &users(&[1]))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::CategoryNotFound(99))
    ));

    let err = service
        .sync_article_assignments(99, &users(&[1]))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::ArticleNotFound(99))
    ));

    assert_eq!(row_count(&conn, "category_assignments"), 0);
    assert_eq!(row_count(&conn, "article_assignments"), 0);
}

#[test]
fn non_positive_ids_fail_validation() {
    let conn = open_db_in_memory().unwrap();
    seed_content(&conn);
    let service = AssignmentService::new(SqliteAssignmentRepository::new(&conn), test_hub());

    let err = service
        .sync_category_assignments(0, &users(&[1]))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Validation(ValidationError::NonPositiveId { .. }))
    ));

    let err = service
        .sync_category_assignments(1, &users(&[1, -2]))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Repo(RepoError::Validation(ValidationError::NonPositiveId { .. }))
    ));
    assert_eq!(row_count(&conn, "category_assignments"), 0);
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
