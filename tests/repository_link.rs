//! PostgreSQL record store tests. Run with `cargo test -- --ignored` against a
//! database reachable through `DATABASE_URL`.

mod common;

use link_router::domain::repositories::LinkRepository;
use link_router::error::AppError;
use link_router::infrastructure::persistence::PgLinkRepository;
use sqlx::PgPool;
use std::sync::Arc;

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_upsert_and_find(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    let saved = repo.upsert(&common::abc123()).await.unwrap();
    assert_eq!(saved, common::abc123());

    let found = repo.find_by_id("abc123").await.unwrap();
    assert_eq!(found, Some(common::abc123()));
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_upsert_replaces_destinations(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    repo.upsert(&common::abc123()).await.unwrap();

    let updated = common::create_test_record(
        "abc123",
        "acc_2",
        &[("default", "https://example.org")],
    );
    repo.upsert(&updated).await.unwrap();

    let found = repo.find_by_id("abc123").await.unwrap().unwrap();
    assert_eq!(found.account_id, "acc_2");
    assert_eq!(found.destinations.len(), 1);
    assert_eq!(found.default_destination(), Some("https://example.org"));
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_find_missing_and_health(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));

    assert!(repo.find_by_id("missing-id").await.unwrap().is_none());
    assert!(repo.health_check().await);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_record_without_default_is_rejected(pool: PgPool) {
    let result = sqlx::query(
        "INSERT INTO links (id, account_id, destinations) VALUES ('x', 'acc_1', '{\"FR\":\"https://example.fr\"}')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err());
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_upsert_rejects_non_http_destination(pool: PgPool) {
    let repo = PgLinkRepository::new(Arc::new(pool));
    let record = common::create_test_record("abc123", "acc_1", &[("default", "example.com/landing")]);

    let err = repo.upsert(&record).await.unwrap_err();

    assert!(matches!(err, AppError::Validation { .. }));
    assert!(repo.find_by_id("abc123").await.unwrap().is_none());
}
