use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::CounterStore;
use crate::error::AppResult;

/// Counter store over the `ephemeral_counters` table.
///
/// Every operation is one statement, so concurrent callers across tasks and
/// instances serialize on the row lock. Expired rows are treated as absent.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ttl_secs(ttl: Duration) -> f64 {
    ttl.as_secs_f64()
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ephemeral_counters (key, count, expires_at)
            VALUES ($1, 1, NOW() + make_interval(secs => $2))
            ON CONFLICT (key) DO UPDATE SET
                count = CASE
                    WHEN ephemeral_counters.expires_at <= NOW() THEN 1
                    ELSE ephemeral_counters.count + 1
                END,
                expires_at = CASE
                    WHEN ephemeral_counters.expires_at <= NOW() THEN EXCLUDED.expires_at
                    ELSE ephemeral_counters.expires_at
                END
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(ttl_secs(ttl))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn try_set_flag(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        // The conditional update returns no row when a live flag already exists
        let claimed: Option<String> = sqlx::query_scalar(
            r#"
            INSERT INTO ephemeral_counters (key, count, expires_at)
            VALUES ($1, 1, NOW() + make_interval(secs => $2))
            ON CONFLICT (key) DO UPDATE SET
                count = 1,
                expires_at = EXCLUDED.expires_at
            WHERE ephemeral_counters.expires_at <= NOW()
            RETURNING key
            "#,
        )
        .bind(key)
        .bind(ttl_secs(ttl))
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.is_some())
    }

    async fn is_set(&self, key: &str) -> AppResult<bool> {
        let set: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM ephemeral_counters WHERE key = $1 AND expires_at > NOW())",
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        Ok(set)
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM ephemeral_counters WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM ephemeral_counters WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
