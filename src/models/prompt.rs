use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One answered question kept in a user's history
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PromptRecord {
    pub id: i32,
    pub user_id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}
