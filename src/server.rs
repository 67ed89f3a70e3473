//! Reusable parking service runtime.
//!
//! [`ServerHandle`] owns the whole lifecycle: database, migrations, the
//! bootstrap administrator, background jobs, the REST API and graceful
//! shutdown. Both binaries start the service through it.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::jobs::{start_availability_reconciler_task, start_session_expiry_task};
use crate::application::notifications::{LogNotifier, NotificationDispatcher};
use crate::application::services::AuthService;
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::{JwtConfig, DEFAULT_ISSUER};
use crate::infrastructure::database::migrator::Migrator;
use crate::interfaces::http::modules::metrics::install_recorder;
use crate::interfaces::http::{create_api_router, ApiServices};
use crate::shared::clock::{SharedClock, SystemClock};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the parking service.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Create the default admin user if no user exists (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running parking service.
///
/// ```rust,no_run
/// use parking_service::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// Repository provider for data access.
    pub repos: Arc<dyn RepositoryProvider>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Port the REST API is listening on.
    pub api_port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the parking service.
    ///
    /// 1. Install the Prometheus recorder
    /// 2. Connect to the database and run migrations (if enabled)
    /// 3. Create the default admin (if enabled)
    /// 4. Start the availability reconciler and session expiry jobs
    /// 5. Start the REST API server (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;

        info!("Starting parking service...");

        let prometheus_handle = prometheus_handle();

        // ── Database ───────────────────────────────────────────
        let db_config = DatabaseConfig {
            url: app_cfg.database.connection_url(),
            pool: app_cfg.database.pool.clone(),
        };
        let db = init_database(&db_config).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        // ── Repositories & Services ────────────────────────────
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let clock: SharedClock = Arc::new(SystemClock);

        let jwt_config = JwtConfig {
            secret: app_cfg.security.jwt_secret.clone(),
            expiration_hours: app_cfg.security.jwt_expiration_hours,
            issuer: DEFAULT_ISSUER.to_string(),
        };
        info!(
            "JWT configured with {}h token expiration",
            jwt_config.expiration_hours
        );
        let auth = AuthService::new(repos.clone(), jwt_config, clock.clone());

        if opts.create_default_admin {
            let admin = &app_cfg.admin;
            if let Err(e) = auth
                .ensure_default_admin(
                    &admin.email,
                    &admin.password,
                    &admin.first_name,
                    &admin.last_name,
                )
                .await
            {
                error!("Failed to create admin user: {}", e);
            }
        }

        let notifications = if app_cfg.notifications.enabled {
            info!("🔔 Notifications enabled (sender {})", app_cfg.notifications.sender);
            NotificationDispatcher::new(
                repos.clone(),
                Arc::new(LogNotifier::new(app_cfg.notifications.sender.clone())),
            )
        } else {
            NotificationDispatcher::disabled(repos.clone())
        };

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Background tasks ───────────────────────────────────
        start_availability_reconciler_task(
            repos.clone(),
            shutdown_signal.clone(),
            app_cfg.jobs.reconcile_interval_secs,
        );
        start_session_expiry_task(
            repos.clone(),
            clock.clone(),
            shutdown_signal.clone(),
            app_cfg.jobs.expiry_interval_secs,
        );

        // ── REST API server ────────────────────────────────────
        let services = ApiServices::from_auth(repos.clone(), clock, auth, notifications);
        let api_router = create_api_router(services, prometheus_handle);

        let api_addr = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        let api_port = listener.local_addr()?.port();
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Parking service started.");

        Ok(Self {
            repos,
            config: app_cfg,
            api_port,
            db,
            shutdown,
            api_task,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking).
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to stop after shutdown has been triggered.
    ///
    /// In-flight requests get `shutdown_timeout` seconds to finish.
    pub async fn wait(self) {
        info!("⏳ Waiting for in-flight requests to complete...");

        let grace = Duration::from_secs(self.shutdown.timeout_secs());
        match tokio::time::timeout(grace, self.api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server task panicked: {}", e),
            Err(_) => warn!(
                timeout_secs = grace.as_secs(),
                "REST API server did not stop in time"
            ),
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 Parking service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down parking service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process; a restart
/// within the same process reuses it. `None` when installation failed.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match install_recorder() {
            Ok(handle) => {
                info!("📊 Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus recorder unavailable, /metrics disabled: {}", e);
                None
            }
        })
        .clone()
}

/// Initialize tracing (logging) from the application config.
///
/// Call this once at process startup (before [`ServerHandle::start`]).
/// `RUST_LOG` takes precedence over `[logging] level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ServerOptions {
        let mut config = AppConfig::default();
        config.server.api_host = "127.0.0.1".into();
        config.server.api_port = 0;
        config.server.shutdown_timeout = 5;
        config.database.url = Some("sqlite::memory:".into());
        config.database.pool.max_connections = 1;
        config.notifications.enabled = false;
        ServerOptions {
            config,
            ..ServerOptions::default()
        }
    }

    #[tokio::test]
    async fn starts_seeds_admin_and_shuts_down() {
        let handle = ServerHandle::start(options()).await.unwrap();
        assert!(handle.api_port > 0);
        assert!(handle.is_running());
        assert_eq!(handle.repos.users().count().await.unwrap(), 1);

        let admin = handle
            .repos
            .users()
            .find_by_email("admin@parking.local")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());

        handle.shutdown().await;
    }
}
