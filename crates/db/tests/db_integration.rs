//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `eventpoll_test`)
//!   `TEST_DB_PASSWORD` (default: `eventpoll_test`)
//!   `TEST_DB_NAME` (default: `eventpoll_test`)

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use eventpoll_common::AppError;
use eventpoll_db::repositories::{PollOptionRepository, PollRepository, PollResponseRepository};
use eventpoll_db::test_utils::{TestDatabase, TestDbConfig};

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_reconcilable_filter() {
    let db = TestDatabase::new().await.unwrap();
    db.cleanup().await.unwrap();
    let now = Utc::now();

    let flagged = db
        .seed_poll("flagged", now + Duration::hours(3), None, true)
        .await
        .unwrap();
    let started = db
        .seed_poll("started", now - Duration::hours(1), None, false)
        .await
        .unwrap();
    db.seed_poll("future", now + Duration::hours(2), None, false)
        .await
        .unwrap();

    let repo = PollRepository::new(db.conn.clone());
    let polls = repo.find_reconcilable(now).await.unwrap();
    let mut ids: Vec<i64> = polls.iter().map(|p| p.id).collect();
    ids.sort_unstable();

    let mut expected = vec![flagged.id, started.id];
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_set_active_is_partial() {
    let db = TestDatabase::new().await.unwrap();
    db.cleanup().await.unwrap();
    let now = Utc::now();

    let poll = db
        .seed_poll("partial", now - Duration::hours(1), Some(now + Duration::hours(1)), false)
        .await
        .unwrap();

    let repo = PollRepository::new(db.conn.clone());
    let updated = repo.set_active(poll.id, true).await.unwrap();

    assert!(updated.is_active);
    assert_eq!(updated.title, "partial");
    assert_eq!(updated.start_date, poll.start_date);
    assert!(updated.updated_at.is_some());

    let missing = repo.set_active(poll.id + 1000, true).await;
    assert!(matches!(missing, Err(AppError::PollNotFound(_))));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_options_and_responses_by_poll() {
    let db = TestDatabase::new().await.unwrap();
    db.cleanup().await.unwrap();
    let now = Utc::now();

    let poll = db.seed_poll("results", now, None, true).await.unwrap();
    let yes = db.seed_option(poll.id, "Yes", 0).await.unwrap();
    let no = db.seed_option(poll.id, "No", 1).await.unwrap();
    db.seed_response(poll.id, yes.id, Some("u1")).await.unwrap();
    db.seed_response(poll.id, yes.id, None).await.unwrap();
    db.seed_response(poll.id, no.id, Some("u2")).await.unwrap();

    let conn = db.conn.clone();
    let options = PollOptionRepository::new(conn.clone())
        .find_by_poll(poll.id)
        .await
        .unwrap();
    assert_eq!(
        options.iter().map(|o| o.option_text.as_str()).collect::<Vec<_>>(),
        vec!["Yes", "No"]
    );

    let responses = PollResponseRepository::new(conn);
    assert_eq!(responses.find_by_poll(poll.id).await.unwrap().len(), 3);
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.database.is_empty());
}
