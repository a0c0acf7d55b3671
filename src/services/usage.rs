use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::{UsageSummary, UsageTotals};

/// Durable per-user, per-day consumption totals.
///
/// Days are calendar days in the configured local offset. Writes are single
/// upsert-with-add statements, so concurrent chargers for the same user and
/// day never lose updates.
#[derive(Clone)]
pub struct UsageLedger {
    pool: PgPool,
    offset: FixedOffset,
}

impl UsageLedger {
    pub fn new(pool: PgPool, offset: FixedOffset) -> Self {
        Self { pool, offset }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    /// Units consumed on `day`; an absent record reads as zero
    pub async fn units_on(&self, user_id: i64, day: NaiveDate) -> AppResult<i64> {
        let units: Option<i64> =
            sqlx::query_scalar("SELECT units FROM usage_records WHERE user_id = $1 AND day = $2")
                .bind(user_id)
                .bind(day)
                .fetch_optional(&self.pool)
                .await?;

        Ok(units.unwrap_or(0))
    }

    pub async fn charge(&self, user_id: i64, units: i64, cost: f64) -> AppResult<()> {
        self.charge_on(user_id, self.today(), units, cost).await
    }

    pub async fn charge_on(
        &self,
        user_id: i64,
        day: NaiveDate,
        units: i64,
        cost: f64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_records (user_id, day, units, cost)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, day) DO UPDATE SET
                units = usage_records.units + EXCLUDED.units,
                cost = usage_records.cost + EXCLUDED.cost,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(day)
        .bind(units)
        .bind(cost)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Totals for one user over `[today - days, today]`
    pub async fn totals_for(
        &self,
        user_id: i64,
        today: NaiveDate,
        days: u64,
    ) -> AppResult<UsageTotals> {
        let since = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);

        let totals = sqlx::query_as::<_, UsageTotals>(
            r#"
            SELECT COALESCE(SUM(units), 0)::BIGINT AS units,
                   COALESCE(SUM(cost), 0)::DOUBLE PRECISION AS cost
            FROM usage_records
            WHERE user_id = $1 AND day >= $2 AND day <= $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    pub async fn summary(&self, user_id: i64) -> AppResult<UsageSummary> {
        let today = self.today();

        let (today_totals, week, month) = tokio::try_join!(
            self.totals_for(user_id, today, 0),
            self.totals_for(user_id, today, 7),
            self.totals_for(user_id, today, 30)
        )?;

        Ok(UsageSummary {
            user_id,
            day: today,
            today: today_totals,
            last_7_days: week,
            last_30_days: month,
        })
    }

    /// Totals across all users over `[today - days, today]`
    pub async fn totals_since(&self, days: u64) -> AppResult<UsageTotals> {
        let today = self.today();
        let since = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);

        let totals = sqlx::query_as::<_, UsageTotals>(
            r#"
            SELECT COALESCE(SUM(units), 0)::BIGINT AS units,
                   COALESCE(SUM(cost), 0)::DOUBLE PRECISION AS cost
            FROM usage_records
            WHERE day >= $1 AND day <= $2
            "#,
        )
        .bind(since)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }
}
