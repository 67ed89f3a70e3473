//! Parking service CLI server
//!
//! Headless parking backend suitable for deployment as a systemd service,
//! Docker container, or standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/parking-service/config.toml)
//! parking-server
//!
//! # Custom config path
//! parking-server --config /etc/parking-service/config.toml
//!
//! # Override the API port
//! parking-server --api-port 8080
//!
//! # Validate config without starting
//! parking-server --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use parking_service::config::AppConfig;
use parking_service::server::{init_tracing, ServerHandle, ServerOptions};

/// Parking service: slots, gate events, billing and parking requests.
#[derive(Parser, Debug)]
#[command(
    name = "parking-server",
    version,
    about = "REST API server for parking facility management",
    long_about = "Parking service REST API server for slot administration, \
                  vehicle entry and exit with hourly billing, and parking requests.\n\n\
                  Default config: ~/.config/parking-service/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "PARKING_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(parking_service::default_config_path);

    let loaded = AppConfig::load(&config_path);
    let mut config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => AppConfig::default(),
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    // Tracing goes up after overrides so --log-level takes effect
    init_tracing(&config);
    match loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            if cli.check {
                return Err(e.into());
            }
            error!("Using default configuration.");
        }
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Database    : {}", config.database.connection_url());
        println!("   Log level   : {}", config.logging.level);
        println!(
            "   Jobs        : reconcile every {}s, expiry every {}s",
            config.jobs.reconcile_interval_secs, config.jobs.expiry_interval_secs
        );
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    // Install OS signal handlers (SIGTERM, SIGINT)
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
