use actix_web::{web, HttpResponse};

use crate::auth::BearerAuth;
use crate::error::AppResult;
use crate::models::InboundMessage;
use crate::services::Assistant;

/// POST /api/messages - handle one normalized chat message and return the
/// reply the transport should send back, if any
pub async fn handle_message(
    assistant: web::Data<Assistant>,
    body: web::Json<InboundMessage>,
    _auth: BearerAuth,
) -> AppResult<HttpResponse> {
    let reply = assistant.handle(&body).await?;
    Ok(HttpResponse::Ok().json(reply))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/messages", web::post().to(handle_message));
}
