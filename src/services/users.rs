use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::models::{User, UserIdentity};

pub const MAX_GRANT_DAYS: i64 = 3650;

const USER_COLUMNS: &str = "telegram_id, username, first_name, last_name, is_premium, \
                            premium_until, invite_count, created_at, updated_at";

#[derive(Debug, Clone, Copy, Serialize, FromRow)]
pub struct UserCounts {
    pub total_users: i64,
    pub premium_users: i64,
}

pub struct UsersService;

impl UsersService {
    /// Creates the user on first contact, refreshing display fields afterwards
    pub async fn upsert(pool: &PgPool, identity: &UserIdentity) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (telegram_id) DO UPDATE SET
                username = EXCLUDED.username,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                updated_at = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(identity.id)
        .bind(&identity.username)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn get(pool: &PgPool, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE telegram_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_or_404(pool: &PgPool, user_id: i64) -> AppResult<User> {
        Self::get(pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Grants premium for `days`, extending an unexpired entitlement
    pub async fn grant_premium(pool: &PgPool, user_id: i64, days: i64) -> AppResult<User> {
        if !(1..=MAX_GRANT_DAYS).contains(&days) {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {}",
                MAX_GRANT_DAYS
            )));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                is_premium = TRUE,
                premium_until = GREATEST(COALESCE(premium_until, NOW()), NOW())
                    + make_interval(days => $2),
                updated_at = NOW()
            WHERE telegram_id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(days as i32)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        log::info!(
            "Granted premium to user {} for {} days (until {:?})",
            user_id,
            days,
            user.premium_until
        );

        Ok(user)
    }

    pub async fn revoke_premium(pool: &PgPool, user_id: i64) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET is_premium = FALSE, premium_until = NULL, updated_at = NOW()
            WHERE telegram_id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        log::info!("Revoked premium from user {}", user_id);
        Ok(user)
    }

    pub async fn list_premium(pool: &PgPool) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE is_premium ORDER BY premium_until ASC",
            USER_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Premium users whose expiry is before `now`
    pub async fn lapsed_ids(pool: &PgPool, now: DateTime<Utc>) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT telegram_id FROM users
            WHERE is_premium AND premium_until < $1
            ORDER BY telegram_id
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }

    /// Clears premium iff it has lapsed at `now`. Returns false when another
    /// writer already cleared or renewed it.
    pub async fn expire_if_lapsed(
        pool: &PgPool,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let cleared: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users SET is_premium = FALSE, premium_until = NULL, updated_at = NOW()
            WHERE telegram_id = $1 AND is_premium AND premium_until < $2
            RETURNING telegram_id
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(cleared.is_some())
    }

    /// Premium users expiring within `[now, until]`
    pub async fn expiring_between(
        pool: &PgPool,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {} FROM users
            WHERE is_premium AND premium_until >= $1 AND premium_until <= $2
            ORDER BY premium_until ASC
            "#,
            USER_COLUMNS
        ))
        .bind(now)
        .bind(until)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn counts(pool: &PgPool) -> AppResult<UserCounts> {
        let counts = sqlx::query_as::<_, UserCounts>(
            r#"
            SELECT COUNT(*) AS total_users,
                   COUNT(*) FILTER (WHERE is_premium AND premium_until > NOW()) AS premium_users
            FROM users
            "#,
        )
        .fetch_one(pool)
        .await?;

        Ok(counts)
    }
}
