use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::clients::CredentialStore;
use crate::error::{AppError, AppResult};

const KEY_PREFIX: &str = "sk-";
const MIN_KEY_LEN: usize = 20;

/// What callers may see about a stored key
#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub user_id: i64,
    pub fingerprint: String,
    pub updated_at: DateTime<Utc>,
}

/// Short stable identifier for a key, safe to log
pub fn fingerprint(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    hex::encode(&digest[..4])
}

pub fn validate_api_key(api_key: &str) -> AppResult<&str> {
    let api_key = api_key.trim();
    if !api_key.starts_with(KEY_PREFIX) || api_key.len() < MIN_KEY_LEN {
        return Err(AppError::Validation(format!(
            "API key must start with '{}' and be at least {} characters",
            KEY_PREFIX, MIN_KEY_LEN
        )));
    }
    if api_key.chars().any(char::is_whitespace) {
        return Err(AppError::Validation("API key must not contain whitespace".to_string()));
    }
    Ok(api_key)
}

/// One credential row per user; setting a key replaces the previous one
pub struct CredentialService;

impl CredentialService {
    pub async fn set(pool: &PgPool, user_id: i64, api_key: &str) -> AppResult<CredentialStatus> {
        let api_key = validate_api_key(api_key)?;

        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO api_keys (user_id, api_key)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET api_key = EXCLUDED.api_key, updated_at = NOW()
            RETURNING updated_at
            "#,
        )
        .bind(user_id)
        .bind(api_key)
        .fetch_one(pool)
        .await?;

        let status = CredentialStatus {
            user_id,
            fingerprint: fingerprint(api_key),
            updated_at,
        };
        log::info!("Stored API key {} for user {}", status.fingerprint, user_id);

        Ok(status)
    }

    pub async fn get(pool: &PgPool, user_id: i64) -> AppResult<Option<String>> {
        let key: Option<String> =
            sqlx::query_scalar("SELECT api_key FROM api_keys WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        Ok(key)
    }

    pub async fn status(pool: &PgPool, user_id: i64) -> AppResult<CredentialStatus> {
        let row: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT api_key, updated_at FROM api_keys WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        let (api_key, updated_at) =
            row.ok_or_else(|| AppError::NotFound(format!("No API key set for user {}", user_id)))?;

        Ok(CredentialStatus {
            user_id,
            fingerprint: fingerprint(&api_key),
            updated_at,
        })
    }

    pub async fn delete(pool: &PgPool, user_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM api_keys WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("No API key set for user {}", user_id)));
        }

        log::info!("Deleted API key for user {}", user_id);
        Ok(())
    }
}

/// [`CredentialStore`] over the `api_keys` table
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn active_credential(&self, user_id: i64) -> AppResult<Option<String>> {
        CredentialService::get(&self.pool, user_id).await
    }
}
