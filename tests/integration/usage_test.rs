//! Integration tests for the usage ledger and quota enforcer

use std::sync::Arc;

use chrono::Days;
use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use tierbot::models::Tier;
use tierbot::services::{QuotaCheck, QuotaEnforcer, UsageLedger};

use crate::common::fixtures::{create_user, quota_config, utc};
use crate::common::TestDb;

async fn setup() -> (TestDb, QuotaEnforcer) {
    let db = TestDb::new().await;
    let ledger = UsageLedger::new(db.pool.clone(), utc());
    let quota = QuotaEnforcer::new(ledger, quota_config());
    (db, quota)
}

#[actix_web::test]
async fn test_concurrent_charges_lose_no_updates() {
    let (db, quota) = setup().await;
    create_user(&db.pool, 1).await;
    let quota = Arc::new(quota);

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let quota = quota.clone();
            tokio::spawn(async move { quota.charge(1, 1, 0.000002).await.unwrap() })
        })
        .collect();
    for result in join_all(handles).await {
        result.unwrap();
    }

    let ledger = quota.ledger();
    assert_eq!(ledger.units_on(1, ledger.today()).await.unwrap(), 100);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage_records WHERE user_id = 1")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[actix_web::test]
async fn test_absent_record_reads_as_full_budget() {
    let (db, quota) = setup().await;
    create_user(&db.pool, 2).await;

    let check = quota.check_remaining(2, Tier::Standard).await.unwrap();
    assert_eq!(
        check,
        QuotaCheck {
            within_limit: true,
            remaining: 10_000,
        }
    );

    let check = quota.check_remaining(2, Tier::Premium).await.unwrap();
    assert_eq!(check.remaining, 100_000);
}

#[actix_web::test]
async fn test_charging_exactly_the_ceiling_denies() {
    let (db, quota) = setup().await;
    create_user(&db.pool, 3).await;

    quota.charge(3, 10_000, 0.02).await.unwrap();
    let check = quota.check_remaining(3, Tier::Standard).await.unwrap();
    assert_eq!(
        check,
        QuotaCheck {
            within_limit: false,
            remaining: 0,
        }
    );

    quota.charge(3, 1, 0.0).await.unwrap();
    let check = quota.check_remaining(3, Tier::Standard).await.unwrap();
    assert_eq!(
        check,
        QuotaCheck {
            within_limit: false,
            remaining: 0,
        }
    );
}

#[actix_web::test]
async fn test_overshoot_then_deny_next() {
    let (db, quota) = setup().await;
    create_user(&db.pool, 4).await;

    quota.charge(4, 9_999, 0.0).await.unwrap();

    let pre = quota.check_remaining(4, Tier::Standard).await.unwrap();
    assert_eq!(
        pre,
        QuotaCheck {
            within_limit: true,
            remaining: 1,
        }
    );

    let cost = quota.cost_for(Tier::Standard, 50);
    quota.charge(4, 50, cost).await.unwrap();

    let ledger = quota.ledger();
    assert_eq!(ledger.units_on(4, ledger.today()).await.unwrap(), 10_049);

    let post = quota.check_remaining(4, Tier::Standard).await.unwrap();
    assert_eq!(
        post,
        QuotaCheck {
            within_limit: false,
            remaining: 0,
        }
    );
}

#[actix_web::test]
async fn test_summary_windows_include_both_ends() {
    let (db, quota) = setup().await;
    create_user(&db.pool, 5).await;
    let ledger = quota.ledger();
    let today = ledger.today();

    ledger.charge_on(5, today, 10, 1.0).await.unwrap();
    ledger.charge_on(5, today - Days::new(7), 20, 2.0).await.unwrap();
    ledger.charge_on(5, today - Days::new(8), 40, 4.0).await.unwrap();
    ledger.charge_on(5, today - Days::new(30), 80, 8.0).await.unwrap();
    ledger.charge_on(5, today - Days::new(31), 160, 16.0).await.unwrap();

    let summary = ledger.summary(5).await.unwrap();
    assert_eq!(summary.today.units, 10);
    assert_eq!(summary.last_7_days.units, 30);
    assert_eq!(summary.last_30_days.units, 150);
    assert!((summary.last_30_days.cost - 15.0).abs() < 1e-9);

    let all = ledger.totals_since(30).await.unwrap();
    assert_eq!(all.units, 150);
}

#[actix_web::test]
async fn test_cost_follows_tier_rate() {
    let (_db, quota) = setup().await;
    assert!((quota.cost_for(Tier::Premium, 1_000) - 0.002).abs() < 1e-12);
    assert!((quota.cost_for(Tier::Standard, 500) - 0.001).abs() < 1e-12);
}
