//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::routes::orders::{AppState, SharedCartClient, SharedMedicineClient};
use order_store::{InMemoryOrderStore, PostgresOrderStore};
use orders::{HttpCartClient, HttpMedicineClient};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const MAX_DB_CONNECTIONS: u32 = 10;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Upstream clients
    let timeout = config.upstream_timeout();
    let cart: SharedCartClient = Arc::new(
        HttpCartClient::new(&config.cart_service_url, timeout)
            .expect("failed to build cart service client"),
    );
    let medicine: SharedMedicineClient = Arc::new(
        HttpMedicineClient::new(&config.medicine_service_url, timeout)
            .expect("failed to build medicine service client"),
    );
    let mode = config.compensation_mode();
    tracing::info!(
        cart_service = %config.cart_service_url,
        medicine_service = %config.medicine_service_url,
        ?mode,
        "upstream services configured"
    );

    // 4. Order store and application
    let app = match &config.database_url {
        Some(url) => {
            let store = PostgresOrderStore::connect(url, MAX_DB_CONNECTIONS)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL order store");
            let state = Arc::new(AppState::new(store, cart, medicine, mode));
            api::create_app(state, metrics_handle)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory only");
            let state = Arc::new(AppState::new(
                InMemoryOrderStore::new(),
                cart,
                medicine,
                mode,
            ));
            api::create_app(state, metrics_handle)
        }
    };

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
