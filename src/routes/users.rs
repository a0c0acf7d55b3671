use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::BearerAuth;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{SetCredential, Tier, UsageSummary};
use crate::services::{CredentialService, PromptHistoryService, QuotaEnforcer, UsersService};

#[derive(Serialize)]
pub struct UsageStatsResponse {
    pub tier: Tier,
    pub daily_ceiling: i64,
    pub remaining: i64,
    pub within_limit: bool,
    #[serde(flatten)]
    pub summary: UsageSummary,
}

/// GET /api/users/{id}/usage - today, 7 and 30 day totals plus quota
pub async fn get_usage(
    pool: web::Data<DbPool>,
    quota: web::Data<QuotaEnforcer>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let user = UsersService::get_or_404(pool.get_ref(), path.into_inner()).await?;
    let tier = user.tier();

    let summary = quota.ledger().summary(user.telegram_id).await?;
    let check = quota.check_remaining(user.telegram_id, tier).await?;

    Ok(HttpResponse::Ok().json(UsageStatsResponse {
        tier,
        daily_ceiling: quota.daily_ceiling(tier),
        remaining: check.remaining,
        within_limit: check.within_limit,
        summary,
    }))
}

/// GET /api/users/{id}/history - recent answered questions, newest first
pub async fn get_history(
    pool: web::Data<DbPool>,
    quota: web::Data<QuotaEnforcer>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let user = UsersService::get_or_404(pool.get_ref(), path.into_inner()).await?;
    let cap = quota.history_cap(user.tier());
    let prompts = PromptHistoryService::list(pool.get_ref(), user.telegram_id, cap).await?;
    Ok(HttpResponse::Ok().json(prompts))
}

/// GET /api/users/{id}/credential - fingerprint of the stored key
pub async fn get_credential(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let status = CredentialService::status(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// PUT /api/users/{id}/credential - set or replace the user's key
pub async fn set_credential(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<SetCredential>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let user = UsersService::get_or_404(pool.get_ref(), path.into_inner()).await?;
    let status = CredentialService::set(pool.get_ref(), user.telegram_id, &body.api_key).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// DELETE /api/users/{id}/credential
pub async fn delete_credential(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    CredentialService::delete(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users/{id}")
            .route("/usage", web::get().to(get_usage))
            .route("/history", web::get().to(get_history))
            .route("/credential", web::get().to(get_credential))
            .route("/credential", web::put().to(set_credential))
            .route("/credential", web::delete().to(delete_credential)),
    );
}
