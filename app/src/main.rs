use std::sync::Arc;
use tracing::{error, info};

mod broadcast;
mod config;
mod error;
mod logging;
mod models;
mod mqtt;
mod observer;
mod rest;

#[tokio::main]
pub async fn main() {
    logging::init();
    info!(version = duckweed_core::CORE_VERSION, "Starting duckweed");

    let config = match config::Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let db_conn = match models::establish_db_connection(&config.database_url()).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed connecting database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = models::run_migrations(&db_conn).await {
        error!("Failed running migrations: {}", e);
        std::process::exit(1);
    }

    let (message_sender, message_receiver) = tokio::sync::mpsc::unbounded_channel();
    let mqtt_client = Arc::new(mqtt::MqttBoardClient::new(
        config.mqtt_namespace(),
        message_sender,
    ));
    let stores = observer::Stores::new(Arc::new(models::PgStore::new(db_conn)));
    let observer = observer::ConcurrentObserver::new(
        stores,
        mqtt_client.clone(),
        message_receiver,
        &config,
    );

    let mqtt_loop = mqtt_client.dispatch_event_loop(config.clone());
    let ingest_loop = observer::ConcurrentObserver::dispatch_ingest_loop(observer.clone());
    let liveness_loop = observer::ConcurrentObserver::dispatch_liveness_loop(
        observer.clone(),
        config.liveness_period(),
    );
    let server_daemon = rest::dispatch_server_daemon(observer.clone(), config.server_port());

    let _ = tokio::join!(mqtt_loop, ingest_loop, liveness_loop, server_daemon);
}
