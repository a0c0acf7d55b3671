use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::PromptRecord;

pub struct PromptHistoryService;

impl PromptHistoryService {
    /// Stores an answered question and prunes the user's history to the newest `cap` entries
    pub async fn record(
        pool: &PgPool,
        user_id: i64,
        question: &str,
        answer: &str,
        cap: i64,
    ) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        sqlx::query("INSERT INTO prompts (user_id, question, answer) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(question)
            .bind(answer)
            .execute(&mut *tx)
            .await?;

        let pruned = sqlx::query(
            r#"
            DELETE FROM prompts
            WHERE id IN (
                SELECT id FROM prompts
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                OFFSET $2
            )
            "#,
        )
        .bind(user_id)
        .bind(cap.max(1))
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if pruned > 0 {
            log::debug!("Pruned {} old prompts for user {}", pruned, user_id);
        }

        Ok(())
    }

    /// Newest first
    pub async fn list(pool: &PgPool, user_id: i64, limit: i64) -> AppResult<Vec<PromptRecord>> {
        let prompts = sqlx::query_as::<_, PromptRecord>(
            r#"
            SELECT id, user_id, question, answer, created_at
            FROM prompts
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(prompts)
    }
}
