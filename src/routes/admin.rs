use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;

use crate::auth::BearerAuth;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{GrantPremium, Tier, UsageTotals, User};
use crate::scheduler;
use crate::services::referrals::TOP_INVITERS_LIMIT;
use crate::services::{
    ChannelService, CredentialService, GroupService, ReferralService, UsageLedger, UsersService,
};

#[derive(Serialize)]
pub struct RevokeResponse {
    pub user: User,
    pub channels_deactivated: u64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_users: i64,
    pub premium_users: i64,
    pub active_channels: usize,
    pub active_groups: i64,
    pub usage_today: UsageTotals,
    pub usage_7_days: UsageTotals,
    pub usage_30_days: UsageTotals,
}

#[derive(Serialize)]
pub struct UserInfoResponse {
    #[serde(flatten)]
    pub user: User,
    pub tier: Tier,
    pub has_api_key: bool,
    pub channels: usize,
    pub active_channels: usize,
}

/// GET /api/admin/users/{id} - profile, entitlement and owned channels
pub async fn get_user(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let pool = pool.get_ref();
    let user = UsersService::get_or_404(pool, path.into_inner()).await?;

    let (api_key, channels) = tokio::try_join!(
        CredentialService::get(pool, user.telegram_id),
        ChannelService::list_for_owner(pool, user.telegram_id),
    )?;

    Ok(HttpResponse::Ok().json(UserInfoResponse {
        tier: user.tier(),
        has_api_key: api_key.is_some(),
        channels: channels.len(),
        active_channels: channels.iter().filter(|c| c.is_active).count(),
        user,
    }))
}

/// GET /api/admin/invitations - users who brought in the most others
pub async fn list_inviters(pool: web::Data<DbPool>, _auth: BearerAuth) -> AppResult<HttpResponse> {
    let inviters = ReferralService::top_inviters(pool.get_ref(), TOP_INVITERS_LIMIT).await?;
    Ok(HttpResponse::Ok().json(inviters))
}

/// POST /api/admin/users/{id}/premium - grant or extend premium
pub async fn grant_premium(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<GrantPremium>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let user = UsersService::grant_premium(pool.get_ref(), path.into_inner(), body.days).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /api/admin/users/{id}/premium - revoke premium and pause channels
pub async fn revoke_premium(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let user = UsersService::revoke_premium(pool.get_ref(), path.into_inner()).await?;
    let channels_deactivated =
        ChannelService::deactivate_for_owner(pool.get_ref(), user.telegram_id).await?;

    Ok(HttpResponse::Ok().json(RevokeResponse {
        user,
        channels_deactivated,
    }))
}

/// GET /api/admin/premium
pub async fn list_premium(pool: web::Data<DbPool>, _auth: BearerAuth) -> AppResult<HttpResponse> {
    let users = UsersService::list_premium(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/admin/stats
pub async fn stats(
    pool: web::Data<DbPool>,
    ledger: web::Data<UsageLedger>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let pool = pool.get_ref();

    let (counts, active_channels, active_groups, today, week, month) = tokio::try_join!(
        UsersService::counts(pool),
        ChannelService::list_active(pool),
        GroupService::count_active(pool),
        ledger.totals_since(0),
        ledger.totals_since(7),
        ledger.totals_since(30),
    )?;

    Ok(HttpResponse::Ok().json(StatsResponse {
        total_users: counts.total_users,
        premium_users: counts.premium_users,
        active_channels: active_channels.len(),
        active_groups,
        usage_today: today,
        usage_7_days: week,
        usage_30_days: month,
    }))
}

/// GET /api/admin/scheduler - active channels and their publish times
pub async fn scheduler_status(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let status = scheduler::status(pool.get_ref(), config.scheduler.utc_offset, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(status))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .route("/users/{id}", web::get().to(get_user))
            .route("/users/{id}/premium", web::post().to(grant_premium))
            .route("/users/{id}/premium", web::delete().to(revoke_premium))
            .route("/premium", web::get().to(list_premium))
            .route("/invitations", web::get().to(list_inviters))
            .route("/stats", web::get().to(stats))
            .route("/scheduler", web::get().to(scheduler_status)),
    );
}
