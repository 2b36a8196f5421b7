//! Climate Import API Server
//!
//! Run with: cargo run --bin climate-api
//!
//! # Configuration
//!
//! Read from `config.toml` in the standard locations (see
//! `climate config`), overridden by environment variables:
//! - `CLIMATE_DHIS2_URL`, `CLIMATE_DHIS2_USERNAME`, `CLIMATE_DHIS2_PASSWORD`, `CLIMATE_DHIS2_TOKEN`
//! - `CLIMATE_API_HOST`, `CLIMATE_API_PORT`
//! - `CLIMATE_LOG_LEVEL`, `CLIMATE_LOG_FORMAT`
//! - `CLIMATE_CONFIG`: Config file path, skips the standard locations
//! - `RUST_LOG`: Log filter, takes precedence over the configured level

use climate_import::api::{serve, AppState};
use climate_import::config::Config;
use climate_import::dhis2::Dhis2Client;
use climate_import::logging;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("CLIMATE_CONFIG") {
        Ok(path) => Config::load_with_env(path.as_ref())?,
        Err(_) => Config::load_default(),
    };
    config.validate()?;
    logging::init(&config.logging)?;

    tracing::info!("Starting climate import API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("DHIS2 instance: {}", config.dhis2.url);
    tracing::info!(
        chunk_size = config.import.chunk_size,
        request_limit = config.import.request_limit,
        "Import settings"
    );

    let client = Arc::new(Dhis2Client::new((&config.dhis2).into())?);

    match client.system_info().await {
        Ok(info) => tracing::info!("Connected to DHIS2 {}", info.version),
        Err(e) => tracing::warn!("DHIS2 not available: {} (imports will fail until it is)", e),
    }

    let state = AppState::new(client, (&config.import).into(), config.api.clone());

    tracing::info!("Starting server on {}", config.api.addr());
    serve(state, &config.api).await?;

    tracing::info!("Climate import API stopped");
    Ok(())
}
