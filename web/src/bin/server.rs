//! Box office server
//!
//! This binary:
//! - Connects to `PostgreSQL` and applies migrations
//! - Wires the reservation coordinator over Postgres and Razorpay
//! - Starts the Prometheus exporter and the hold expiry sweeper
//! - Serves the JSON API until Ctrl+C, then drains in-flight requests
//!
//! # Usage
//!
//! ```bash
//! docker compose up -d postgres
//! RAZORPAY_KEY_ID=... RAZORPAY_KEY_SECRET=... cargo run --bin boxoffice-server
//! ```

use anyhow::Context;
use boxoffice_core::environment::SystemClock;
use boxoffice_postgres::PostgresBoxOffice;
use boxoffice_razorpay::RazorpayGateway;
use boxoffice_runtime::metrics::MetricsServer;
use boxoffice_runtime::{
    CoordinatorEnvironment, ReservationCoordinator, TracingNotifier, spawn_expiry_sweeper,
};
use boxoffice_web::{AppState, Config, build_router};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting box office server...");

    let mut metrics = MetricsServer::new(config.metrics_addr().context("invalid metrics address")?);
    metrics.start().context("failed to start metrics exporter")?;

    let store = PostgresBoxOffice::connect_with(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(config.database.connect_timeout),
    )
    .await
    .context("failed to connect to PostgreSQL")?;
    store.migrate().await.context("failed to run migrations")?;
    let store = Arc::new(store);

    let razorpay = config
        .razorpay()
        .context("RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET must be set")?;
    let gateway = RazorpayGateway::new(razorpay).context("failed to build payment client")?;
    let checkout_key = gateway.key_id().to_string();

    let env = CoordinatorEnvironment {
        clock: Arc::new(SystemClock),
        catalog: store.clone(),
        inventory: store.clone(),
        ledger: store.clone(),
        offers: store,
        gateway: Arc::new(gateway),
        notifier: Arc::new(TracingNotifier::new()),
    };
    let coordinator = Arc::new(ReservationCoordinator::new(env, config.coordinator_config()));
    let sweeper = spawn_expiry_sweeper(Arc::clone(&coordinator), config.sweep_interval());

    let app = build_router(AppState::new(coordinator).with_checkout_key(checkout_key));
    let addr = config.listen_addr().context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Box office server is running");

    let drain = Duration::from_secs(config.server.shutdown_timeout);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shutting down gracefully...");
    if tokio::time::timeout(drain, sweeper.shutdown()).await.is_err() {
        tracing::warn!("Expiry sweeper did not stop within the shutdown timeout");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
