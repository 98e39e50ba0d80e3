use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use kiosk_display::{Config, HttpTransport, Kiosk};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Kiosk {} using content server {}",
        config.device_id,
        config.server_url
    );

    let transport = Arc::new(HttpTransport::new(Client::new(), config.server_url.clone()));
    let kiosk = Kiosk::new(config, transport);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal.cancel(),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    kiosk.run(shutdown).await;
}
