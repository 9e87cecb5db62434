//! Entry pass HTTP server.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Starts the Prometheus metrics exporter
//! - Opens the `PostgreSQL` store, or the in-memory store without `DATABASE_URL`
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/entrypass cargo run --bin entrypass-server
//! ```

use entrypass::environment::SystemClock;
use entrypass::notification::WhatsAppGateway;
use entrypass::server::{AppState, build_router};
use entrypass::store::{EventCatalog, InMemoryStore, PostgresStore, ReservationStore};
use entrypass::{Config, LifecycleManager, LifecycleSettings, metrics};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entrypass=info,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting entry pass server");

    // Load configuration
    let config = Config::from_env();
    info!(
        address = %config.bind_address(),
        database = config.database.url.is_some(),
        whatsapp = config.notification.has_credentials(),
        "Configuration loaded"
    );

    // Metrics exporter
    let metrics_addr: SocketAddr =
        format!("{}:{}", config.server.metrics_host, config.server.metrics_port).parse()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;
    metrics::register_business_metrics();
    info!(address = %metrics_addr, "Metrics exporter listening");

    // Storage
    let notifier = Arc::new(WhatsAppGateway::new(&config.notification));
    let settings = LifecycleSettings::from_config(&config);
    let state = if config.database.url.is_some() {
        info!("Connecting to PostgreSQL...");
        let store = PostgresStore::connect(&config.database).await?;
        store.migrate().await?;
        info!("PostgreSQL store ready");
        let shared = Arc::new(store.clone());
        let lifecycle = LifecycleManager::new(
            shared.clone() as Arc<dyn ReservationStore>,
            shared as Arc<dyn EventCatalog>,
            notifier,
            Arc::new(SystemClock),
            settings,
        );
        AppState::new(lifecycle, "postgres").with_database(store)
    } else {
        warn!("DATABASE_URL not set, reservations are kept in memory only");
        let store = Arc::new(InMemoryStore::new());
        let lifecycle = LifecycleManager::new(
            store.clone() as Arc<dyn ReservationStore>,
            store as Arc<dyn EventCatalog>,
            notifier,
            Arc::new(SystemClock),
            settings,
        );
        AppState::new(lifecycle, "memory")
    };

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
