mod config;
mod consumer;
mod errors;
mod notifier;

use agromatch_engine::{
    events::{EventHandlers, EventHooks},
    matching::{DirectionsApiConfig, DirectionsClient, MatchFlowApi, SystemClock},
    sqlite::db::run_migrations,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::WorkerConfig,
    consumer::{recover_interrupted_work, QueueConsumer},
    errors::WorkerError,
    notifier::register_log_notifier,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = WorkerConfig::from_env_or_default();
    if let Err(e) = run(config).await {
        error!("🚀️ The worker terminated with an error: {e}");
        std::process::exit(1);
    }
}

async fn run(config: WorkerConfig) -> Result<(), WorkerError> {
    info!("🚀️ Starting the match worker against {}", config.database_url);
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections).await?;
    run_migrations(db.pool()).await?;

    let mut hooks = EventHooks::default();
    register_log_notifier(&mut hooks);
    let handlers = EventHandlers::new(config.event_buffer_size, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let routing = DirectionsApiConfig::from_env().map(DirectionsClient::new);
    if routing.is_none() {
        info!("🚀️ No directions API token configured. Distances will be straight-line estimates.");
    }
    let api = MatchFlowApi::new(db.clone(), routing, SystemClock, config.matching.clone(), producers);

    recover_interrupted_work(&db, config.max_attempts).await;

    let consumer = QueueConsumer::new(api, config.poll_interval_seconds, config.retry_backoff);
    tokio::select! {
        _ = consumer.run() => {},
        _ = tokio::signal::ctrl_c() => info!("🚀️ Shutdown signal received. Stopping the worker."),
    }
    Ok(())
}
