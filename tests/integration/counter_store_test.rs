//! Integration tests for the PostgreSQL-backed counter store and limiter

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tierbot::services::{RateLimiter, Surface};
use tierbot::store::{CounterStore, PgCounterStore};

use crate::common::TestDb;

const MINUTE: Duration = Duration::from_secs(60);

#[actix_web::test]
async fn test_concurrent_increments_are_atomic() {
    let db = TestDb::new().await;
    let store = Arc::new(PgCounterStore::new(db.pool.clone()));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store.incr_with_expiry("rate:chat:1", MINUTE).await.unwrap()
            })
        })
        .collect();

    let mut values: Vec<i64> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
    values.sort_unstable();

    assert_eq!(values, (1..=50).collect::<Vec<i64>>());
}

#[actix_web::test]
async fn test_expired_counter_restarts_at_one() {
    let db = TestDb::new().await;
    let store = PgCounterStore::new(db.pool.clone());
    let ttl = Duration::from_millis(500);

    assert_eq!(store.incr_with_expiry("k", ttl).await.unwrap(), 1);
    assert_eq!(store.incr_with_expiry("k", ttl).await.unwrap(), 2);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(store.incr_with_expiry("k", ttl).await.unwrap(), 1);
}

#[actix_web::test]
async fn test_expiry_is_fixed_from_first_hit() {
    let db = TestDb::new().await;
    let store = PgCounterStore::new(db.pool.clone());

    store.incr_with_expiry("fixed", MINUTE).await.unwrap();
    let first: chrono::DateTime<chrono::Utc> =
        sqlx::query_scalar("SELECT expires_at FROM ephemeral_counters WHERE key = 'fixed'")
            .fetch_one(&db.pool)
            .await
            .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    store.incr_with_expiry("fixed", MINUTE).await.unwrap();
    let second: chrono::DateTime<chrono::Utc> =
        sqlx::query_scalar("SELECT expires_at FROM ephemeral_counters WHERE key = 'fixed'")
            .fetch_one(&db.pool)
            .await
            .unwrap();

    assert_eq!(first, second);
}

#[actix_web::test]
async fn test_flag_is_claimed_by_exactly_one_caller() {
    let db = TestDb::new().await;
    let store = Arc::new(PgCounterStore::new(db.pool.clone()));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.try_set_flag("warn:chat:5", MINUTE).await.unwrap() })
        })
        .collect();

    let claimed = join_all(handles)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();

    assert_eq!(claimed, 1);
    assert!(store.is_set("warn:chat:5").await.unwrap());

    store.clear("warn:chat:5").await.unwrap();
    assert!(!store.is_set("warn:chat:5").await.unwrap());
}

#[actix_web::test]
async fn test_purge_removes_only_expired_keys() {
    let db = TestDb::new().await;
    let store = PgCounterStore::new(db.pool.clone());

    store.try_set_flag("short", Duration::from_millis(100)).await.unwrap();
    store.try_set_flag("long", MINUTE).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(store.purge_expired().await.unwrap(), 1);
    assert!(store.is_set("long").await.unwrap());
}

#[actix_web::test]
async fn test_limiter_admits_exactly_limit_under_concurrency() {
    let db = TestDb::new().await;
    let limiter = RateLimiter::new(Arc::new(PgCounterStore::new(db.pool.clone())));
    let surface = Surface::Chat(-1001);

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.admit(surface, 5, MINUTE).await.unwrap() })
        })
        .collect();

    let admissions: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(admissions.iter().filter(|a| a.admitted).count(), 5);
    assert_eq!(admissions.iter().map(|a| a.count).max(), Some(12));

    let warnings: Vec<bool> = join_all((0..7).map(|_| limiter.should_warn(surface, MINUTE))).await;
    assert_eq!(warnings.into_iter().filter(|w| *w).count(), 1);
}
