use actix_web::{web, HttpResponse};

use crate::auth::BearerAuth;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{RegisterGroup, UpdateGroup};
use crate::services::GroupService;

/// POST /api/groups - register a group with its owner
pub async fn register_group(
    pool: web::Data<DbPool>,
    body: web::Json<RegisterGroup>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let group = GroupService::register(pool.get_ref(), &body).await?;
    Ok(HttpResponse::Created().json(group))
}

pub async fn get_group(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let group = GroupService::get(pool.get_ref(), id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {} not found", id)))?;
    Ok(HttpResponse::Ok().json(group))
}

/// PATCH /api/groups/{id} - footer, rate limit, active flag
pub async fn update_group(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    body: web::Json<UpdateGroup>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let group = GroupService::update(pool.get_ref(), path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(group))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/groups")
            .route("", web::post().to(register_group))
            .route("/{id}", web::get().to(get_group))
            .route("/{id}", web::patch().to(update_group)),
    );
}
