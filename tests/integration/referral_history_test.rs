//! Integration tests for invite credit and prompt history

use pretty_assertions::assert_eq;
use tierbot::error::AppError;
use tierbot::services::{PromptHistoryService, ReferralService, UsersService};

use crate::common::fixtures::create_user;
use crate::common::TestDb;

// =============================================================================
// Referrals
// =============================================================================

#[actix_web::test]
async fn test_referral_credits_inviter_once() {
    let db = TestDb::new().await;
    create_user(&db.pool, 1).await;
    create_user(&db.pool, 2).await;
    create_user(&db.pool, 3).await;

    assert!(ReferralService::record(&db.pool, 1, 2).await.unwrap());
    assert!(!ReferralService::record(&db.pool, 1, 2).await.unwrap());
    // Already credited to user 1
    assert!(!ReferralService::record(&db.pool, 3, 2).await.unwrap());
    assert!(ReferralService::record(&db.pool, 1, 3).await.unwrap());

    let inviter = UsersService::get_or_404(&db.pool, 1).await.unwrap();
    assert_eq!(inviter.invite_count, 2);
    let other = UsersService::get_or_404(&db.pool, 3).await.unwrap();
    assert_eq!(other.invite_count, 0);
}

#[actix_web::test]
async fn test_invalid_referrals_are_rejected() {
    let db = TestDb::new().await;
    create_user(&db.pool, 1).await;

    let result = ReferralService::record(&db.pool, 1, 1).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = ReferralService::record(&db.pool, 999, 1).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM referrals")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[actix_web::test]
async fn test_top_inviters_order_and_filter() {
    let db = TestDb::new().await;
    for id in 1..=6 {
        create_user(&db.pool, id).await;
    }
    ReferralService::record(&db.pool, 1, 2).await.unwrap();
    ReferralService::record(&db.pool, 3, 4).await.unwrap();
    ReferralService::record(&db.pool, 3, 5).await.unwrap();

    let inviters = ReferralService::top_inviters(&db.pool, 20).await.unwrap();
    let ranked: Vec<(i64, i32)> = inviters
        .iter()
        .map(|i| (i.telegram_id, i.invite_count))
        .collect();
    assert_eq!(ranked, vec![(3, 2), (1, 1)]);

    let limited = ReferralService::top_inviters(&db.pool, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

// =============================================================================
// Prompt history
// =============================================================================

#[actix_web::test]
async fn test_history_keeps_newest_entries_up_to_cap() {
    let db = TestDb::new().await;
    create_user(&db.pool, 1).await;

    for i in 1..=5 {
        let question = format!("question {}", i);
        PromptHistoryService::record(&db.pool, 1, &question, "answer", 3)
            .await
            .unwrap();
    }

    let history = PromptHistoryService::list(&db.pool, 1, 10).await.unwrap();
    let questions: Vec<&str> = history.iter().map(|p| p.question.as_str()).collect();
    assert_eq!(questions, vec!["question 5", "question 4", "question 3"]);
}

#[actix_web::test]
async fn test_history_cap_is_per_user() {
    let db = TestDb::new().await;
    create_user(&db.pool, 1).await;
    create_user(&db.pool, 2).await;

    for _ in 0..4 {
        PromptHistoryService::record(&db.pool, 1, "q", "a", 10).await.unwrap();
    }
    PromptHistoryService::record(&db.pool, 2, "q", "a", 1).await.unwrap();
    PromptHistoryService::record(&db.pool, 2, "q", "a", 1).await.unwrap();

    assert_eq!(PromptHistoryService::list(&db.pool, 1, 100).await.unwrap().len(), 4);
    assert_eq!(PromptHistoryService::list(&db.pool, 2, 100).await.unwrap().len(), 1);
}
