use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::Inviter;

/// Rows returned by the admin invitation report
pub const TOP_INVITERS_LIMIT: i64 = 20;

pub struct ReferralService;

impl ReferralService {
    /// Credits `referrer_id` for bringing in `referred_id`.
    ///
    /// A user is credited to one inviter only; later attempts return
    /// `Ok(false)` and leave both the referral and the invite count alone.
    pub async fn record(pool: &PgPool, referrer_id: i64, referred_id: i64) -> AppResult<bool> {
        if referrer_id == referred_id {
            return Err(AppError::Validation("Users cannot refer themselves".to_string()));
        }

        let credited: Option<i64> = sqlx::query_scalar(
            r#"
            WITH inserted AS (
                INSERT INTO referrals (referrer_id, referred_id)
                VALUES ($1, $2)
                ON CONFLICT (referred_id) DO NOTHING
                RETURNING referrer_id
            )
            UPDATE users SET invite_count = invite_count + 1, updated_at = NOW()
            WHERE telegram_id IN (SELECT referrer_id FROM inserted)
            RETURNING telegram_id
            "#,
        )
        .bind(referrer_id)
        .bind(referred_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(format!("User {} not found", referrer_id))
            }
            other => AppError::Database(other),
        })?;

        if credited.is_some() {
            log::info!("User {} joined through an invite from {}", referred_id, referrer_id);
        }

        Ok(credited.is_some())
    }

    /// Users with at least one invite, most invites first
    pub async fn top_inviters(pool: &PgPool, limit: i64) -> AppResult<Vec<Inviter>> {
        let inviters = sqlx::query_as::<_, Inviter>(
            r#"
            SELECT telegram_id, username, first_name, invite_count
            FROM users
            WHERE invite_count > 0
            ORDER BY invite_count DESC, telegram_id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(inviters)
    }
}
