// src/main.rs
use pallet_planner::{api, config::AppConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let planning_config = app_config.planner.clone();

    info!("🚀 Pallet planner starting...");
    if let Err(err) = api::start_api_server(api_config, planning_config).await {
        error!("❌ API server terminated with an error: {err}");
        std::process::exit(1);
    }
}
