use actix_web::{http::StatusCode, web, HttpResponse};
use serde::Serialize;

use crate::db::{self, DbPool};
use crate::store::CounterStore;

const PROBE_KEY: &str = "health:probe";

#[derive(Serialize)]
pub struct LivenessResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: &'static str,
    checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    database: &'static str,
    counter_store: &'static str,
}

fn check(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

/// GET /health - the process is up
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(LivenessResponse { status: "ok" })
}

/// GET /health/ready - 503 unless the database and the counter store answer.
/// The limiter fails open, so a broken store still degrades readiness.
pub async fn readiness(
    pool: web::Data<DbPool>,
    store: web::Data<dyn CounterStore>,
) -> HttpResponse {
    let db_ok = db::health_check(pool.get_ref()).await;
    let store_ok = store.is_set(PROBE_KEY).await.is_ok();

    let (status, http_status) = if db_ok && store_ok {
        ("ready", StatusCode::OK)
    } else {
        ("not_ready", StatusCode::SERVICE_UNAVAILABLE)
    };

    HttpResponse::build(http_status).json(ReadinessResponse {
        status,
        checks: ReadinessChecks {
            database: check(db_ok),
            counter_store: check(store_ok),
        },
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(liveness))
            .route("/ready", web::get().to(readiness)),
    );
}
