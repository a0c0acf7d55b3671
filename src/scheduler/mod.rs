//! Autonomous content scheduler.
//!
//! A fixed-granularity poll matches each eligible channel's local `HH:MM`
//! against the wall clock and publishes a batch per due channel.

pub mod format;
pub mod worker;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::services::ChannelService;

pub use worker::{BatchOutcome, ContentScheduler, PublishFailure};

#[derive(Debug, Serialize)]
pub struct ScheduledChannel {
    pub id: i32,
    pub owner_id: i64,
    pub label: String,
    pub schedule_time: String,
    pub posts_per_batch: i32,
    pub last_post_at: Option<DateTime<Utc>>,
}

/// Snapshot of what the scheduler would consider, for operators
#[derive(Debug, Serialize)]
pub struct SchedulerStatus {
    pub checked_at: DateTime<Utc>,
    pub local_time: String,
    pub active_channels: usize,
    pub channels: Vec<ScheduledChannel>,
}

pub async fn status(
    pool: &PgPool,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> AppResult<SchedulerStatus> {
    let channels: Vec<ScheduledChannel> = ChannelService::list_active(pool)
        .await?
        .into_iter()
        .map(|c| ScheduledChannel {
            id: c.id,
            owner_id: c.owner_id,
            label: c.label().to_string(),
            schedule_time: c.schedule_time,
            posts_per_batch: c.posts_per_batch,
            last_post_at: c.last_post_at,
        })
        .collect();

    Ok(SchedulerStatus {
        checked_at: now,
        local_time: now.with_timezone(&offset).format("%H:%M:%S").to_string(),
        active_channels: channels.len(),
        channels,
    })
}
