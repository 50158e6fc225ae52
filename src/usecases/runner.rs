//! Settlement Runner - Tick-driven Polling Loop
//!
//! Owns the poll scheduler and drives the settlement service until
//! shutdown. Each tick loads the open bets, picks the ones that are due,
//! sweeps them and retires every bet that reached a final status.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use super::poll_scheduler::PollScheduler;
use super::settlement::{SettlementReport, SettlementService};
use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::config::SettlementConfig;
use crate::domain::bet::{Bet, BetId};
use crate::ports::bet_store::BetStore;
use crate::ports::match_feed::MatchFeed;

/// Background loop settling open bets.
pub struct SettlementRunner<F: MatchFeed, S: BetStore> {
  service: SettlementService<F, S>,
  feed: Arc<F>,
  store: Arc<S>,
  scheduler: PollScheduler,
  metrics: Arc<MetricsRegistry>,
  health: Arc<HealthState>,
  tick: Duration,
}

impl<F: MatchFeed, S: BetStore> SettlementRunner<F, S> {
  pub fn new(
    feed: Arc<F>,
    store: Arc<S>,
    metrics: Arc<MetricsRegistry>,
    health: Arc<HealthState>,
    config: &SettlementConfig,
  ) -> Self {
    let service = SettlementService::new(
      Arc::clone(&feed),
      Arc::clone(&store),
      Arc::clone(&metrics),
      config.max_concurrent_bets,
    );

    Self {
      service,
      feed,
      store,
      scheduler: PollScheduler::new(config.poll_interval(), config.min_poll_gap()),
      metrics,
      health,
      tick: config.tick_interval(),
    }
  }

  /// Run until a shutdown signal arrives.
  #[instrument(skip(self, shutdown_rx), name = "settlement_loop")]
  pub async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    info!(tick_secs = self.tick.as_secs(), "Starting settlement runner");

    let mut ticker = tokio::time::interval(self.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Settlement runner received shutdown signal");
          break;
        }
        _ = ticker.tick() => {
          if let Err(e) = self.tick_once(Utc::now()).await {
            error!(error = %e, "Settlement tick failed");
          }
        }
      }
    }

    info!("Settlement runner stopped cleanly");
    Ok(())
  }

  /// One scheduling pass. Returns the sweep report when any bet was due.
  pub async fn tick_once(&mut self, now: DateTime<Utc>) -> Result<Option<SettlementReport>> {
    self.refresh_health().await;

    let open = self
      .store
      .open_bets()
      .await
      .context("Failed to load open bets")?;
    self
      .metrics
      .open_bets
      .set(i64::try_from(open.len()).unwrap_or(i64::MAX));

    let open_ids: HashSet<BetId> = open.iter().map(|b| b.id).collect();
    self.scheduler.forget_missing(&open_ids);

    let due: Vec<Bet> = open
      .into_iter()
      .filter(|b| self.scheduler.due(b.id, now))
      .collect();

    if due.is_empty() {
      debug!(open = open_ids.len(), "No bets due");
      return Ok(None);
    }

    for bet in &due {
      self.scheduler.record_poll(bet.id, now);
    }

    let report = self.service.sweep(due).await;
    let finished: Vec<BetId> = report.final_bets().collect();
    for bet_id in finished {
      self.scheduler.retire(bet_id);
    }

    Ok(Some(report))
  }

  async fn refresh_health(&self) {
    self
      .health
      .feed_healthy
      .store(self.feed.is_healthy().await, Ordering::Relaxed);
    self
      .health
      .store_healthy
      .store(self.store.is_healthy().await, Ordering::Relaxed);
  }
}
