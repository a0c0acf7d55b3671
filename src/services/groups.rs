use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{Group, RegisterGroup, UpdateGroup};

pub const MIN_GROUP_RATE_LIMIT: i32 = 1;
pub const MAX_GROUP_RATE_LIMIT: i32 = 100;

pub struct GroupService;

impl GroupService {
    /// Registers the group, or re-activates it under a new owner
    pub async fn register(pool: &PgPool, input: &RegisterGroup) -> AppResult<Group> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (group_id, title, owner_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id) DO UPDATE SET
                title = COALESCE(EXCLUDED.title, groups.title),
                owner_id = EXCLUDED.owner_id,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(input.group_id)
        .bind(&input.title)
        .bind(input.owner_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(format!("User {} not found", input.owner_id))
            }
            other => AppError::Database(other),
        })?;

        log::info!("Registered group {} owned by {}", group.group_id, input.owner_id);
        Ok(group)
    }

    pub async fn get(pool: &PgPool, group_id: i64) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE group_id = $1")
            .bind(group_id)
            .fetch_optional(pool)
            .await?;

        Ok(group)
    }

    pub async fn update(pool: &PgPool, group_id: i64, input: &UpdateGroup) -> AppResult<Group> {
        if let Some(limit) = input.rate_limit {
            if !(MIN_GROUP_RATE_LIMIT..=MAX_GROUP_RATE_LIMIT).contains(&limit) {
                return Err(AppError::Validation(format!(
                    "rate_limit must be between {} and {}",
                    MIN_GROUP_RATE_LIMIT, MAX_GROUP_RATE_LIMIT
                )));
            }
        }

        sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups SET
                footer_text = COALESCE($2, footer_text),
                rate_limit = COALESCE($3, rate_limit),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE group_id = $1
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(&input.footer_text)
        .bind(input.rate_limit)
        .bind(input.is_active)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {} not found", group_id)))
    }

    pub async fn record_question(pool: &PgPool, group_id: i64) -> AppResult<()> {
        sqlx::query("UPDATE groups SET total_questions = total_questions + 1 WHERE group_id = $1")
            .bind(group_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn count_active(pool: &PgPool) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE is_active")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
