use aqi_dashboard::config::{Config, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use aqi_dashboard::dataset::Dataset;
use aqi_dashboard::web::{self, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,aqi_dashboard=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("AQI Forecasting Dashboard starting...");

    // Load configuration
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {}: {}\n\n\
             Make sure:\n\
             1. {} exists (or set {} to another file)\n\
             2. All referenced environment variables are set (check .env.example)",
            config_path,
            e,
            config_path,
            CONFIG_PATH_ENV
        )
    })?;
    info!("Configuration loaded from {}", config_path);

    // Load and merge the data sources
    let dataset = Dataset::build(&config).map_err(|e| {
        anyhow::anyhow!(
            "Failed to build dashboard data: {}\n\n\
             Sources:\n\
             - historical: {}\n\
             - forecast:   {}\n\
             - aqi:        {}\n\
             - stylesheet: {}",
            e,
            config.sources.historical.display(),
            config.sources.forecast.display(),
            config.sources.aqi.display(),
            config.sources.stylesheet.display()
        )
    })?;

    // Bind the listener
    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", address, e))?;

    // Serve until Ctrl+C or SIGTERM
    let state = Arc::new(AppState { dataset });
    if let Err(e) = web::serve(listener, state, shutdown_signal()).await {
        error!("Server error: {}", e);
    }

    info!("AQI Forecasting Dashboard shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
