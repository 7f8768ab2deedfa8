mod config;
mod error;
mod middleware;
mod routes;
mod state;

use clap::Parser;
use config::Config;
use kibotos_objectstore::ObjectStore;
use kibotos_store::Store;
use kibotos_telemetry::{init_logging, metrics, TelemetryConfig};
use kibotos_vlm::HttpVlmClient;
use state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let telemetry_config = TelemetryConfig::from_env("kibotos-api");
    init_logging(&telemetry_config)?;
    metrics::register_metrics()?;

    let store = Store::connect(&config.database_url, config.db_max_connections).await?;
    let objectstore = ObjectStore::connect(&config.object_store_config())?;
    let vlm_client: Arc<dyn kibotos_vlm::VlmClient> = Arc::new(HttpVlmClient::new(
        config.vlm_api_url.clone(),
        config.vlm_api_key.clone(),
        config.vlm_model.clone(),
    ));

    let app_state = AppState::new(store, objectstore, vlm_client, &config);
    let router = routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(addr = %config.bind, "kibotos-api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received, draining in-flight requests");
}
