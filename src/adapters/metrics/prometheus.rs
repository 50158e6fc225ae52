//! Prometheus Metrics Registry - Settlement Observability
//!
//! Registers and exposes Prometheus metrics on :9090. Covers polls,
//! feed requests and errors, leg verdicts, bet settlements, credited winnings and
//! unroutable market labels.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Centralized Prometheus metrics for the settler.
///
/// All metrics follow the naming convention `sportsbook_settler_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Bet evaluations performed.
    pub polls: IntCounter,
    /// Snapshot fetches by result (`ok` / `error`).
    pub snapshot_requests: IntCounterVec,
    /// Snapshot fetch latency in milliseconds.
    pub snapshot_latency_ms: Histogram,
    /// Legs that reached a verdict, by market kind and status.
    pub selections_decided: IntCounterVec,
    /// Selections whose label could not be routed to a rule, by parse failure.
    pub unrecognized_markets: IntCounterVec,
    /// Bets that left pending, by final status.
    pub bets_settled: IntCounterVec,
    /// Sum of returns credited to wallets.
    pub winnings_credited: Counter,
    /// Bets still awaiting settlement.
    pub open_bets: IntGauge,
    /// Wall time of one sweep over open bets, in milliseconds.
    pub sweep_duration_ms: Histogram,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let polls = IntCounter::new(
            "sportsbook_settler_polls_total",
            "Bet evaluations performed",
        )?;

        let snapshot_requests = IntCounterVec::new(
            Opts::new(
                "sportsbook_settler_snapshot_requests_total",
                "Match snapshot requests to the feed",
            ),
            &["result"],
        )?;

        let snapshot_latency_ms = Histogram::with_opts(
            HistogramOpts::new(
                "sportsbook_settler_snapshot_latency_ms",
                "Match snapshot request latency in milliseconds",
            )
            .buckets(vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0, 15000.0]),
        )?;

        let selections_decided = IntCounterVec::new(
            Opts::new(
                "sportsbook_settler_selections_decided_total",
                "Selections that reached a final verdict",
            ),
            &["market", "status"],
        )?;

        let unrecognized_markets = IntCounterVec::new(
            Opts::new(
                "sportsbook_settler_unrecognized_markets_total",
                "Selections whose market label could not be routed",
            ),
            &["reason"],
        )?;

        let bets_settled = IntCounterVec::new(
            Opts::new(
                "sportsbook_settler_bets_settled_total",
                "Bets that left pending",
            ),
            &["status"],
        )?;

        let winnings_credited = Counter::new(
            "sportsbook_settler_winnings_credited_total",
            "Total returns credited to wallets",
        )?;

        let open_bets = IntGauge::new(
            "sportsbook_settler_open_bets",
            "Bets still awaiting settlement",
        )?;

        let sweep_duration_ms = Histogram::with_opts(
            HistogramOpts::new(
                "sportsbook_settler_sweep_duration_ms",
                "Duration of one settlement sweep in milliseconds",
            )
            .buckets(vec![10.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0]),
        )?;

        registry.register(Box::new(polls.clone()))?;
        registry.register(Box::new(snapshot_requests.clone()))?;
        registry.register(Box::new(snapshot_latency_ms.clone()))?;
        registry.register(Box::new(selections_decided.clone()))?;
        registry.register(Box::new(unrecognized_markets.clone()))?;
        registry.register(Box::new(bets_settled.clone()))?;
        registry.register(Box::new(winnings_credited.clone()))?;
        registry.register(Box::new(open_bets.clone()))?;
        registry.register(Box::new(sweep_duration_ms.clone()))?;

        Ok(Self {
            registry,
            polls,
            snapshot_requests,
            snapshot_latency_ms,
            selections_decided,
            unrecognized_markets,
            bets_settled,
            winnings_credited,
            open_bets,
            sweep_duration_ms,
        })
    }

    /// Encode every registered metric in the text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    metrics.render().map_err(|e| {
                        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                    })
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_families() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.bets_settled.with_label_values(&["won"]).inc();
        metrics.winnings_credited.inc_by(42.5);
        metrics.open_bets.set(3);

        let text = metrics.render().unwrap();
        assert!(text.contains("sportsbook_settler_bets_settled_total{status=\"won\"} 1"));
        assert!(text.contains("sportsbook_settler_winnings_credited_total 42.5"));
        assert!(text.contains("sportsbook_settler_open_bets 3"));
    }
}
