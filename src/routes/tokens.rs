use actix_web::{web, HttpResponse};

use crate::auth::BearerAuth;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::CreateApiToken;
use crate::services::ApiTokenService;

/// GET /api/tokens - token metadata, never the secret
pub async fn list_tokens(pool: web::Data<DbPool>, _auth: BearerAuth) -> AppResult<HttpResponse> {
    let tokens = ApiTokenService::list(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/tokens - the response is the only time the token is shown
pub async fn create_token(
    pool: web::Data<DbPool>,
    body: web::Json<CreateApiToken>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let token = ApiTokenService::create(pool.get_ref(), &body).await?;
    Ok(HttpResponse::Created().json(token.to_created_response()))
}

/// DELETE /api/tokens/{id}
pub async fn revoke_token(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if id == auth.token.id {
        log::warn!("API token {} revoked itself", id);
    }
    ApiTokenService::revoke(pool.get_ref(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tokens")
            .route("", web::get().to(list_tokens))
            .route("", web::post().to(create_token))
            .route("/{id}", web::delete().to(revoke_token)),
    );
}
