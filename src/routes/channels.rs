use actix_web::{web, HttpResponse};

use crate::auth::BearerAuth;
use crate::clients::Publisher;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::channel::normalize_destination;
use crate::models::{CreateChannel, Tier, UpdateChannel};
use crate::services::{ChannelService, UsersService};

async fn require_capability(publisher: &dyn Publisher, destination: &str) -> AppResult<()> {
    let capable = publisher
        .verify_capability(destination)
        .await
        .map_err(|e| {
            log::warn!("Capability check for {} failed: {}", destination, e);
            AppError::Upstream(format!("Could not verify {}: {}", destination, e.public_reason()))
        })?;

    if !capable {
        return Err(AppError::Forbidden(format!(
            "The bot must be an administrator of {}",
            destination
        )));
    }
    Ok(())
}

/// GET /api/users/{owner}/channels
pub async fn list_channels(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let channels = ChannelService::list_for_owner(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(channels))
}

/// POST /api/users/{owner}/channels - register a verified destination
pub async fn create_channel(
    pool: web::Data<DbPool>,
    publisher: web::Data<dyn Publisher>,
    path: web::Path<i64>,
    body: web::Json<CreateChannel>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let owner = UsersService::get_or_404(pool.get_ref(), path.into_inner()).await?;

    let destination = normalize_destination(&body.destination).ok_or_else(|| {
        AppError::Validation(format!(
            "'{}' is not a channel username, t.me link or chat id",
            body.destination
        ))
    })?;
    require_capability(publisher.get_ref(), &destination).await?;

    let channel =
        ChannelService::create(pool.get_ref(), owner.telegram_id, &destination, &body).await?;
    Ok(HttpResponse::Created().json(channel))
}

/// PATCH /api/users/{owner}/channels/{id}
pub async fn update_channel(
    pool: web::Data<DbPool>,
    path: web::Path<(i64, i32)>,
    body: web::Json<UpdateChannel>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let (owner_id, id) = path.into_inner();
    ChannelService::get_owned(pool.get_ref(), id, owner_id).await?;

    let channel = ChannelService::update(pool.get_ref(), id, &body).await?;
    Ok(HttpResponse::Ok().json(channel))
}

/// POST /api/users/{owner}/channels/{id}/activate - premium owners only,
/// with publish rights re-verified
pub async fn activate_channel(
    pool: web::Data<DbPool>,
    publisher: web::Data<dyn Publisher>,
    path: web::Path<(i64, i32)>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let (owner_id, id) = path.into_inner();
    let owner = UsersService::get_or_404(pool.get_ref(), owner_id).await?;
    let channel = ChannelService::get_owned(pool.get_ref(), id, owner_id).await?;

    if owner.tier() != Tier::Premium {
        return Err(AppError::Forbidden(
            "Scheduled posting requires an active premium subscription".to_string(),
        ));
    }
    require_capability(publisher.get_ref(), &channel.destination).await?;

    let channel = ChannelService::set_active(pool.get_ref(), id, true).await?;
    Ok(HttpResponse::Ok().json(channel))
}

/// POST /api/users/{owner}/channels/{id}/deactivate
pub async fn deactivate_channel(
    pool: web::Data<DbPool>,
    path: web::Path<(i64, i32)>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let (owner_id, id) = path.into_inner();
    ChannelService::get_owned(pool.get_ref(), id, owner_id).await?;

    let channel = ChannelService::set_active(pool.get_ref(), id, false).await?;
    Ok(HttpResponse::Ok().json(channel))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/users/{owner}/channels")
            .route("", web::get().to(list_channels))
            .route("", web::post().to(create_channel))
            .route("/{id}", web::patch().to(update_channel))
            .route("/{id}/activate", web::post().to(activate_channel))
            .route("/{id}/deactivate", web::post().to(deactivate_channel)),
    );
}
