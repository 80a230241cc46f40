//! Binary entry point: load configuration, wire the resolution engine,
//! serve the API.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vitibrasil_api::api::{self, AppState};
use vitibrasil_api::cache::RedisStore;
use vitibrasil_api::config::AppConfig;
use vitibrasil_api::scrape::SiteClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // LOG_LEVEL keeps parity with the original deployment; RUST_LOG
    // still wins for anyone used to it.
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        bind = %config.bind,
        port = config.port,
        csv_dir = %config.csv_dir.display(),
        "Starting vitibrasil-api"
    );

    let store = Arc::new(RedisStore::new(&config.redis)?);
    let fetcher = Arc::new(SiteClient::new(config.fetch_timeout)?);
    let state = AppState::new(config, store, fetcher);

    api::start_server(state).await?;
    Ok(())
}
