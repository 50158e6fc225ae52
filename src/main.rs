//! Sportsbook Settler - Entry Point
//!
//! Loads configuration, wires the feed, store and metrics adapters, and
//! runs the settlement loop until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Create HttpMatchFeed (reqwest + rate limit + retry)
//! 4. Open FileBetStore (ledger.json + transaction log)
//! 5. Spawn Prometheus metrics server (/metrics)
//! 6. Spawn health server (/live + /ready)
//! 7. Spawn SettlementRunner (tick-driven tokio::select! loop)
//! 8. Wait for SIGINT → graceful shutdown
//!
//! The binary only settles. Bets enter the store through the library
//! (`usecases::BetPlacement` with `[betting]` limits, `FileBetStore::deposit`)
//! from whatever front end embeds it.

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use sportsbook_settler::adapters::feed::HttpMatchFeed;
use sportsbook_settler::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use sportsbook_settler::adapters::persistence::FileBetStore;
use sportsbook_settler::config;
use sportsbook_settler::ports::bet_store::BetStore;
use sportsbook_settler::usecases::SettlementRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::var("SETTLER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        feed = %config.feed.base_url,
        poll_interval_secs = config.settlement.poll_interval_secs,
        data_dir = %config.persistence.data_dir,
        "Starting sportsbook settler"
    );

    // ── 3. Shutdown channel ─────────────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Adapters ─────────────────────────────────────────
    let feed = Arc::new(
        HttpMatchFeed::new(config.feed.clone()).context("Failed to create match feed client")?,
    );
    let store = Arc::new(
        FileBetStore::from_data_dir(&config.persistence.data_dir)
            .await
            .context("Failed to open bet store")?,
    );
    let open = store.open_bets().await.context("Failed to read open bets")?;
    info!(open_bets = open.len(), "Bet store opened");

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());

    // ── 5. Metrics server ───────────────────────────────────
    let metrics_handle = if config.metrics.enabled {
        let server = Arc::clone(&metrics);
        let bind = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.serve(bind, rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    // ── 6. Health server ────────────────────────────────────
    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
    let health_rx = shutdown_tx.subscribe();
    let health_handle = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_rx).await {
            error!(error = %e, "Health server failed");
        }
    });

    // ── 7. Settlement runner ────────────────────────────────
    let mut runner = SettlementRunner::new(
        Arc::clone(&feed),
        Arc::clone(&store),
        Arc::clone(&metrics),
        Arc::clone(&health),
        &config.settlement,
    );
    let runner_rx = shutdown_tx.subscribe();
    let runner_handle = tokio::spawn(async move {
        if let Err(e) = runner.run(runner_rx).await {
            error!(error = %e, "Settlement runner failed");
        }
    });

    info!("All tasks spawned, settler is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for SIGINT, shutting down");
    } else {
        info!("SIGINT received, initiating graceful shutdown");
    }

    // Readiness goes red before anything stops.
    health.store_healthy.store(false, Ordering::Relaxed);
    let _ = shutdown_tx.send(());

    // An in-flight sweep finishes its current writes.
    if tokio::time::timeout(Duration::from_secs(30), runner_handle)
        .await
        .is_err()
    {
        warn!("Settlement runner did not stop within 30s");
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}
