use log::{info, warn};
use sqlx::PgPool;
use std::env;

use crate::auth::token::is_valid_token_format;
use crate::error::AppResult;
use crate::services::ApiTokenService;

const BOOTSTRAP_DESCRIPTION: &str = "bootstrap";

/// Seeds the first API token from `TIERBOT_BOOTSTRAP_TOKEN` when none exist.
///
/// A well-formed 40-hex value is stored as given; any other non-empty value
/// generates a token that is printed once to stderr.
pub async fn create_token_if_needed(pool: &PgPool) -> AppResult<()> {
    let requested = match env::var("TIERBOT_BOOTSTRAP_TOKEN") {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => {
            info!("TIERBOT_BOOTSTRAP_TOKEN not set, skipping bootstrap token");
            return Ok(());
        }
    };

    if ApiTokenService::any_exist(pool).await? {
        warn!("TIERBOT_BOOTSTRAP_TOKEN set but API tokens already exist, skipping");
        return Ok(());
    }

    if is_valid_token_format(&requested) {
        let token = ApiTokenService::insert(pool, &requested, Some(BOOTSTRAP_DESCRIPTION)).await?;
        info!("Bootstrap API token {} stored from environment", token.id);
    } else {
        let token = ApiTokenService::create(
            pool,
            &crate::models::CreateApiToken {
                description: Some(BOOTSTRAP_DESCRIPTION.to_string()),
            },
        )
        .await?;
        eprintln!("Bootstrap API token: {}", token.token);
        info!("Bootstrap API token {} generated", token.id);
    }

    Ok(())
}
