use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::error::AppError;

pub const MIN_POSTS_PER_BATCH: i32 = 1;
pub const MAX_POSTS_PER_BATCH: i32 = 10;

/// A managed channel that receives scheduled generated posts
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Channel {
    pub id: i32,
    pub owner_id: i64,
    pub destination: String,
    pub title: Option<String>,
    pub prompt: String,
    pub schedule_time: String,
    pub posts_per_batch: i32,
    pub is_active: bool,
    pub last_post_at: Option<DateTime<Utc>>,
    pub total_posts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.destination)
    }
}

/// DTO for registering a channel
#[derive(Debug, Deserialize)]
pub struct CreateChannel {
    pub destination: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub schedule_time: Option<String>,
    #[serde(default)]
    pub posts_per_batch: Option<i32>,
}

/// DTO for owner-initiated configuration changes
#[derive(Debug, Default, Deserialize)]
pub struct UpdateChannel {
    pub title: Option<String>,
    pub prompt: Option<String>,
    pub schedule_time: Option<String>,
    pub posts_per_batch: Option<i32>,
}

/// Local time of day a channel publishes at (`HH:MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScheduleTime {
    hour: u32,
    minute: u32,
}

impl ScheduleTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// The wall-clock minute of `at` in its own timezone
    pub fn of<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self {
            hour: at.hour(),
            minute: at.minute(),
        }
    }
}

impl FromStr for ScheduleTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Validation(format!("'{}' is not a valid HH:MM time", s));

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;

        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl std::fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

pub fn validate_posts_per_batch(posts: i32) -> Result<i32, AppError> {
    if (MIN_POSTS_PER_BATCH..=MAX_POSTS_PER_BATCH).contains(&posts) {
        Ok(posts)
    } else {
        Err(AppError::Validation(format!(
            "posts_per_batch must be between {} and {}",
            MIN_POSTS_PER_BATCH, MAX_POSTS_PER_BATCH
        )))
    }
}

/// Normalizes a destination given as `@name`, a `t.me/name` link or a numeric chat id
pub fn normalize_destination(input: &str) -> Option<String> {
    let input = input.trim();

    if let Some(name) = input.strip_prefix('@') {
        return is_public_name(name).then(|| format!("@{}", name));
    }

    if input.parse::<i64>().is_ok() {
        return Some(input.to_string());
    }

    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = url::Url::parse(&with_scheme).ok()?;
    if !matches!(url.host_str(), Some("t.me") | Some("telegram.me")) {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let name = segments.next()?;
    if segments.next().is_some() || !is_public_name(name) {
        return None;
    }
    Some(format!("@{}", name))
}

fn is_public_name(name: &str) -> bool {
    name.len() >= 4
        && name.len() <= 32
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
