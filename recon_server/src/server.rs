use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use recon_engine::{
    events::{EventHandlers, EventHooks},
    DepositMatcher,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    config::LinkerConfig,
    errors::ServerError,
    linker_worker::{start_linker_worker, LinkerStatus, LinkerWorker},
    routes::{health, status},
};

const EVENT_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: LinkerConfig) -> Result<(), ServerError> {
    let db = open_database(&config).await?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, alert_hooks());
    let matcher = DepositMatcher::new(db, config.match_settings(), handlers.producers());
    handlers.start_handlers();
    let worker = Arc::new(LinkerWorker::new(matcher, config.cycle_timeout));
    let linker_status = worker.status();
    let worker_handle = start_linker_worker(worker, config.poll_interval);

    if config.disable_status_server {
        info!("🚀️ Status server is disabled. Running the linker only.");
        tokio::select! {
            res = worker_handle => res.map_err(|e| ServerError::Unspecified(format!("Linker worker stopped. {e}")))?,
            res = tokio::signal::ctrl_c() => res?,
        }
        return Ok(());
    }
    info!("🚀️ Starting status server on {}:{}", config.host, config.port);
    let srv = create_server_instance(&config, linker_status)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    worker_handle.abort();
    result
}

async fn open_database(config: &LinkerConfig) -> Result<SqliteDatabase, ServerError> {
    let url = config.database_url.reveal();
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        info!("🗃️ Creating a new store at {}", config.database_url);
        Sqlite::create_database(url).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let db = SqliteDatabase::new_with_url(url, 5).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        debug!("🗃️ Migrations are up to date");
    }
    Ok(db)
}

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Routes integrity emergencies to the error log, which is the alert sink of this deployment.
pub fn alert_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_orphaned_claim(|ev| {
        Box::pin(async move {
            error!(
                "🚨️ ALERT: deposit #{} ({}, account {}) is claimed but does not fund order #{}. Reason: {}. Manual \
                 reconciliation required.",
                ev.deposit.id, ev.deposit.amount, ev.deposit.account_id, ev.order.id, ev.reason
            );
        }) as BoxedHook
    });
    hooks.on_cycle_completed(|ev| {
        Box::pin(async move {
            if ev.report.has_integrity_failures() {
                error!("🚨️ ALERT: linker cycle finished with {} orphaned claims. {}", ev.report.orphaned_claims, ev.report);
            } else {
                trace!("📬️ Cycle completed: {}", ev.report);
            }
        }) as BoxedHook
    });
    hooks
}

pub fn create_server_instance(
    config: &LinkerConfig,
    linker_status: Arc<std::sync::Mutex<LinkerStatus>>,
) -> Result<Server, ServerError> {
    let linker_status = web::Data::from(linker_status);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("recon::access_log"))
            .app_data(linker_status.clone())
            .service(health)
            .service(status)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
