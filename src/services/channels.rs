use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::channel::validate_posts_per_batch;
use crate::models::{Channel, CreateChannel, ScheduleTime, UpdateChannel};

pub const DEFAULT_SCHEDULE_TIME: &str = "09:00";
pub const DEFAULT_PROMPT: &str =
    "Educational content about programming and technology for a general audience";

const CHANNEL_COLUMNS: &str = "id, owner_id, destination, title, prompt, schedule_time, \
                               posts_per_batch, is_active, last_post_at, total_posts, \
                               created_at, updated_at";

pub struct ChannelService;

impl ChannelService {
    /// Registers a destination that has already been verified.
    /// New channels start inactive.
    pub async fn create(
        pool: &PgPool,
        owner_id: i64,
        destination: &str,
        input: &CreateChannel,
    ) -> AppResult<Channel> {
        let schedule_time = match &input.schedule_time {
            Some(t) => t.parse::<ScheduleTime>()?.to_string(),
            None => DEFAULT_SCHEDULE_TIME.to_string(),
        };
        let posts_per_batch = validate_posts_per_batch(input.posts_per_batch.unwrap_or(1))?;
        let prompt = non_empty(input.prompt.as_deref()).unwrap_or(DEFAULT_PROMPT);

        let channel = sqlx::query_as::<_, Channel>(&format!(
            r#"
            INSERT INTO channels
                (owner_id, destination, title, prompt, schedule_time, posts_per_batch)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            CHANNEL_COLUMNS
        ))
        .bind(owner_id)
        .bind(destination)
        .bind(&input.title)
        .bind(prompt)
        .bind(&schedule_time)
        .bind(posts_per_batch)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(format!("Channel {} is already registered", destination))
            }
            other => AppError::Database(other),
        })?;

        log::info!("Registered channel {} ({}) for owner {}", channel.id, destination, owner_id);
        Ok(channel)
    }

    pub async fn get(pool: &PgPool, id: i32) -> AppResult<Channel> {
        sqlx::query_as::<_, Channel>(&format!(
            "SELECT {} FROM channels WHERE id = $1",
            CHANNEL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", id)))
    }

    /// Loads a channel the caller owns; another owner's channel reads as missing
    pub async fn get_owned(pool: &PgPool, id: i32, owner_id: i64) -> AppResult<Channel> {
        let channel = Self::get(pool, id).await?;
        if channel.owner_id != owner_id {
            return Err(AppError::NotFound(format!("Channel {} not found", id)));
        }
        Ok(channel)
    }

    pub async fn list_for_owner(pool: &PgPool, owner_id: i64) -> AppResult<Vec<Channel>> {
        let channels = sqlx::query_as::<_, Channel>(&format!(
            "SELECT {} FROM channels WHERE owner_id = $1 ORDER BY created_at ASC",
            CHANNEL_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(channels)
    }

    pub async fn update(pool: &PgPool, id: i32, input: &UpdateChannel) -> AppResult<Channel> {
        let schedule_time = input
            .schedule_time
            .as_deref()
            .map(|t| t.parse::<ScheduleTime>().map(|t| t.to_string()))
            .transpose()?;
        let posts_per_batch = input.posts_per_batch.map(validate_posts_per_batch).transpose()?;
        if matches!(&input.prompt, Some(p) if p.trim().is_empty()) {
            return Err(AppError::Validation("prompt must not be empty".to_string()));
        }

        let channel = sqlx::query_as::<_, Channel>(&format!(
            r#"
            UPDATE channels SET
                title = COALESCE($2, title),
                prompt = COALESCE($3, prompt),
                schedule_time = COALESCE($4, schedule_time),
                posts_per_batch = COALESCE($5, posts_per_batch),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CHANNEL_COLUMNS
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.prompt)
        .bind(&schedule_time)
        .bind(posts_per_batch)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", id)))?;

        Ok(channel)
    }

    pub async fn set_active(pool: &PgPool, id: i32, active: bool) -> AppResult<Channel> {
        let channel = sqlx::query_as::<_, Channel>(&format!(
            r#"
            UPDATE channels SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CHANNEL_COLUMNS
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", id)))?;

        log::info!("Channel {} is now {}", id, if active { "active" } else { "inactive" });
        Ok(channel)
    }

    /// Deactivates every active channel of `owner_id`, returning the count
    pub async fn deactivate_for_owner(pool: &PgPool, owner_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE channels SET is_active = FALSE, updated_at = NOW()
            WHERE owner_id = $1 AND is_active
            "#,
        )
        .bind(owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Active channels whose owner holds unexpired premium at `now`
    pub async fn list_eligible(pool: &PgPool, now: DateTime<Utc>) -> AppResult<Vec<Channel>> {
        let channels = sqlx::query_as::<_, Channel>(
            r#"
            SELECT c.id, c.owner_id, c.destination, c.title, c.prompt, c.schedule_time,
                   c.posts_per_batch, c.is_active, c.last_post_at, c.total_posts,
                   c.created_at, c.updated_at
            FROM channels c
            JOIN users u ON u.telegram_id = c.owner_id
            WHERE c.is_active AND u.is_premium AND u.premium_until > $1
            ORDER BY c.id
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(channels)
    }

    pub async fn list_active(pool: &PgPool) -> AppResult<Vec<Channel>> {
        let channels = sqlx::query_as::<_, Channel>(&format!(
            "SELECT {} FROM channels WHERE is_active ORDER BY schedule_time, id",
            CHANNEL_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        Ok(channels)
    }

    /// Stamps the last publish and adds `published` to the post counter
    pub async fn record_publish(pool: &PgPool, id: i32, published: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE channels SET
                last_post_at = NOW(),
                total_posts = total_posts + $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(published)
        .execute(pool)
        .await?;

        Ok(())
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
