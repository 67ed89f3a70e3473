//! Parking service
//!
//! REST API server for parking facility management.
//! Reads configuration from TOML file (~/.config/parking-service/config.toml),
//! or the path in `PARKING_CONFIG`.

use tracing::{error, info};

use parking_service::server::{init_tracing, ServerHandle, ServerOptions};
use parking_service::{default_config_path, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("PARKING_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!("Failed to load config: {}. Using defaults.", e);
            cfg
        }
    };

    let handle = match ServerHandle::start(ServerOptions {
        config,
        ..ServerOptions::default()
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start parking service: {}", e);
            return Err(e);
        }
    };

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
