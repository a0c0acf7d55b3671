use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One user's aggregated consumption for one calendar day
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UsageRecord {
    pub user_id: i64,
    pub day: NaiveDate,
    pub units: i64,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sum of units and cost over a range of days
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, FromRow)]
pub struct UsageTotals {
    pub units: i64,
    pub cost: f64,
}

/// Today, trailing week and trailing month for one user
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub user_id: i64,
    pub day: NaiveDate,
    pub today: UsageTotals,
    pub last_7_days: UsageTotals,
    pub last_30_days: UsageTotals,
}
