use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub group_id: i64,
    pub title: Option<String>,
    pub owner_id: Option<i64>,
    pub footer_text: Option<String>,
    pub is_active: bool,
    pub rate_limit: i32,
    pub total_questions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterGroup {
    pub group_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub owner_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroup {
    pub footer_text: Option<String>,
    pub rate_limit: Option<i32>,
    pub is_active: Option<bool>,
}
