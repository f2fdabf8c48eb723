use anyhow::{Context, Result};
use paybridge::api::{self, AppState};
use paybridge::config::{Config, LogFormat};
use paybridge::payments::providers::{EDahabProvider, WaafiPayProvider};
use paybridge::payments::PaymentFlow;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "paybridge=info,tower_http=info";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_tracing(config.logging.format);

    // Log startup info
    tracing::info!("Starting PayBridge");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("WaafiPay endpoint: {}", config.waafipay.endpoint);
    tracing::info!("eDahab base URL: {}", config.edahab.base_url);

    let waafipay = WaafiPayProvider::new(config.waafipay.clone())?;
    let edahab = EDahabProvider::new(config.edahab.clone())?;
    let flow = PaymentFlow::new(Arc::new(waafipay), Arc::new(edahab));

    let addr = config.server.bind_address();
    let app = api::router(AppState::new(flow, config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
