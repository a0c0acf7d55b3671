use sqlx::PgPool;

use crate::auth::generate_token;
use crate::error::{AppError, AppResult};
use crate::models::{ApiToken, CreateApiToken};

const TOKEN_COLUMNS: &str = "id, token, description, created_at, last_used_at";

/// Bearer tokens that authorize the transport adapter and operators
pub struct ApiTokenService;

impl ApiTokenService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<ApiToken>> {
        let tokens = sqlx::query_as::<_, ApiToken>(&format!(
            "SELECT {} FROM api_tokens ORDER BY created_at DESC",
            TOKEN_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        Ok(tokens)
    }

    pub async fn find(pool: &PgPool, token: &str) -> AppResult<Option<ApiToken>> {
        let found = sqlx::query_as::<_, ApiToken>(&format!(
            "SELECT {} FROM api_tokens WHERE token = $1",
            TOKEN_COLUMNS
        ))
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(found)
    }

    pub async fn create(pool: &PgPool, input: &CreateApiToken) -> AppResult<ApiToken> {
        Self::insert(pool, &generate_token(), input.description.as_deref()).await
    }

    /// Stores a caller-chosen token, already checked for format
    pub async fn insert(
        pool: &PgPool,
        token: &str,
        description: Option<&str>,
    ) -> AppResult<ApiToken> {
        let token = sqlx::query_as::<_, ApiToken>(&format!(
            "INSERT INTO api_tokens (token, description) VALUES ($1, $2) RETURNING {}",
            TOKEN_COLUMNS
        ))
        .bind(token)
        .bind(description)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Token already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

        log::info!("Created API token {}", token.id);
        Ok(token)
    }

    pub async fn revoke(pool: &PgPool, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM api_tokens WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Token with id {} not found", id)));
        }

        log::info!("Revoked API token {}", id);
        Ok(())
    }

    pub async fn touch(pool: &PgPool, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE api_tokens SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn any_exist(pool: &PgPool) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM api_tokens)")
            .fetch_one(pool)
            .await?;

        Ok(exists)
    }
}
