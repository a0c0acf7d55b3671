use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use tokio::sync::watch;

use tierbot::bootstrap;
use tierbot::clients::{
    CompletionClient, CredentialStore, Notifier, OpenAiClient, Publisher, TelegramClient,
};
use tierbot::config::{self, CounterStoreBackend};
use tierbot::db;
use tierbot::dispatch::CommandTable;
use tierbot::routes;
use tierbot::scheduler::ContentScheduler;
use tierbot::services::{Assistant, PgCredentialStore, QuotaEnforcer, RateLimiter, UsageLedger};
use tierbot::store::{CounterStore, MemoryCounterStore, PgCounterStore};
use tierbot::subscription::SubscriptionSweep;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::Config::from_env().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("Starting tierbot on {}:{}", config.host, config.port);

    let db_pool = db::create_pool(&config.database).await.map_err(|e| {
        log::error!("Database pool error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    db::run_migrations(&db_pool).await.map_err(|e| {
        log::error!("Migration error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    if let Err(e) = bootstrap::create_token_if_needed(&db_pool).await {
        log::error!("Failed to create bootstrap token: {}", e);
    }

    let store: Arc<dyn CounterStore> = match config.counter_store {
        CounterStoreBackend::Postgres => Arc::new(PgCounterStore::new(db_pool.clone())),
        CounterStoreBackend::Memory => {
            log::warn!(
                "Using in-memory counter store; limits are per process and reset on restart"
            );
            Arc::new(MemoryCounterStore::new())
        }
    };

    let telegram = Arc::new(TelegramClient::new(&config.telegram).map_err(|e| {
        log::error!("Failed to build Bot API client: {}", e);
        std::io::Error::other(e.to_string())
    })?);
    let publisher: Arc<dyn Publisher> = telegram.clone();
    let notifier: Arc<dyn Notifier> = telegram;

    let completion: Arc<dyn CompletionClient> =
        Arc::new(OpenAiClient::new(&config.completion).map_err(|e| {
            log::error!("Failed to build completion client: {}", e);
            std::io::Error::other(e.to_string())
        })?);
    let credentials: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(db_pool.clone()));

    let ledger = UsageLedger::new(db_pool.clone(), config.scheduler.utc_offset);
    let quota = QuotaEnforcer::new(ledger.clone(), config.quota.clone());

    let assistant = web::Data::new(Assistant::new(
        db_pool.clone(),
        CommandTable::new(),
        RateLimiter::new(store.clone()),
        quota.clone(),
        credentials.clone(),
        completion.clone(),
        config.rate_limit.clone(),
        config.completion.timeout,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Arc::new(ContentScheduler::new(
        db_pool.clone(),
        store.clone(),
        credentials,
        completion,
        publisher.clone(),
        notifier.clone(),
        quota.clone(),
        config.scheduler.clone(),
        config.completion.timeout,
    ));
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let sweep = Arc::new(SubscriptionSweep::new(
        db_pool.clone(),
        store.clone(),
        notifier,
        config.subscription.clone(),
    ));
    let sweep_task = tokio::spawn(sweep.run(shutdown_rx));

    let host = config.host.clone();
    let port = config.port;
    let publisher_data: web::Data<dyn Publisher> = web::Data::from(publisher);
    let store_data: web::Data<dyn CounterStore> = web::Data::from(store);
    let ledger_data = web::Data::new(ledger);
    let quota_data = web::Data::new(quota);
    let config_data = web::Data::new(config);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(config_data.clone())
            .app_data(assistant.clone())
            .app_data(publisher_data.clone())
            .app_data(store_data.clone())
            .app_data(ledger_data.clone())
            .app_data(quota_data.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .shutdown_timeout(30)
    .run();

    let server_handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Shutdown signal received, stopping server and background tasks...");
        if shutdown_tx.send(true).is_err() {
            log::debug!("Background tasks already stopped");
        }
        server_handle.stop(true).await;
    });

    server.await?;

    for (name, task) in [("scheduler", scheduler_task), ("subscription sweep", sweep_task)] {
        if let Err(e) = task.await {
            log::error!("{} task ended abnormally: {}", name, e);
        }
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
