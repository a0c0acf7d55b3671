use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::Future;
use std::pin::Pin;

use super::token::parse_bearer;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::ApiToken;
use crate::services::ApiTokenService;

/// Requires a valid `Authorization: Bearer <token>` on `/api` routes
pub struct BearerAuth {
    pub token: ApiToken,
}

impl FromRequest for BearerAuth {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(pool) = req.app_data::<web::Data<DbPool>>().cloned() else {
            return Box::pin(async {
                Err(AppError::Internal("Database pool not configured".to_string()))
            });
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Box::pin(async move {
            let header = header
                .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

            let token_str = parse_bearer(&header).ok_or_else(|| {
                AppError::Unauthorized(
                    "Expected 'Bearer <token>' with 40 lowercase hex chars".to_string(),
                )
            })?;

            let token = ApiTokenService::find(pool.get_ref(), token_str)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Invalid Bearer token".to_string()))?;

            let token_id = token.id;
            tokio::spawn(async move {
                if let Err(e) = ApiTokenService::touch(pool.get_ref(), token_id).await {
                    log::debug!("Failed to update last_used_at for token {}: {}", token_id, e);
                }
            });

            Ok(BearerAuth { token })
        })
    }
}
