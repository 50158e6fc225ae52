//! Settlement Use Case - Evaluate and Settle Open Bets
//!
//! Pulls a fresh snapshot for every undecided leg, runs the leg's market
//! rule against it and hands the verdicts to the store, which owns the
//! pending → won/lost transition and the winnings credit.
//!
//! Settlement flow:
//! 1. Skip legs that already have a verdict
//! 2. Fetch one snapshot per distinct match in the bet
//! 3. Validate each remaining leg (feed gaps leave the leg pending)
//! 4. Apply the verdicts through `BetStore::apply_evaluation`
//! 5. Report transitions and credited winnings

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::adapters::metrics::MetricsRegistry;
use crate::domain::bet::{Bet, BetId, MatchId};
use crate::domain::outcome::{aggregate, BetStatus};
use crate::domain::snapshot::MatchSnapshot;
use crate::ports::bet_store::{BetStore, BetUpdate, LegUpdate, SettlementTransition};
use crate::ports::match_feed::MatchFeed;

/// Verdicts computed for one bet, before they are applied.
#[derive(Debug, Clone)]
pub struct BetEvaluation {
  /// Leg updates ready for the store.
  pub update: BetUpdate,
  /// Status implied by merging the new verdicts into the bet.
  pub provisional_status: BetStatus,
  /// Legs left pending because their snapshot could not be fetched.
  pub fetch_failures: usize,
  /// Legs left pending because their market label could not be routed.
  pub unrecognized: usize,
}

/// Outcome of settling a single bet within a sweep.
#[derive(Debug, Clone)]
pub struct BetResult {
  pub bet_id: BetId,
  /// Transition applied by the store, if the call succeeded.
  pub transition: Option<SettlementTransition>,
  /// Error message if the bet could not be processed.
  pub error: Option<String>,
}

/// Aggregated report from a settlement sweep.
#[derive(Debug, Clone)]
pub struct SettlementReport {
  /// Individual bet results.
  pub results: Vec<BetResult>,
  /// Bets that moved to won in this sweep.
  pub bets_won: usize,
  /// Bets that moved to lost in this sweep.
  pub bets_lost: usize,
  /// Bets that could not be processed.
  pub bets_failed: usize,
  /// Returns credited to wallets in this sweep.
  pub total_credited: Decimal,
  /// Timestamp of the sweep.
  pub timestamp: DateTime<Utc>,
}

impl SettlementReport {
  fn from_results(results: Vec<BetResult>) -> Self {
    let mut report = Self {
      bets_won: 0,
      bets_lost: 0,
      bets_failed: 0,
      total_credited: Decimal::ZERO,
      timestamp: Utc::now(),
      results: Vec::new(),
    };

    for result in &results {
      match &result.transition {
        Some(SettlementTransition::Settled { status, credited }) => {
          match status {
            BetStatus::Won => report.bets_won += 1,
            BetStatus::Lost => report.bets_lost += 1,
            BetStatus::Pending => {}
          }
          report.total_credited += credited.unwrap_or(Decimal::ZERO);
        }
        Some(_) => {}
        None => report.bets_failed += 1,
      }
    }

    report.results = results;
    report
  }

  /// Bets that no longer need polling.
  pub fn final_bets(&self) -> impl Iterator<Item = BetId> + '_ {
    self
      .results
      .iter()
      .filter(|r| r.transition.as_ref().is_some_and(SettlementTransition::is_final))
      .map(|r| r.bet_id)
  }
}

/// Settles bets against live match data.
pub struct SettlementService<F: MatchFeed, S: BetStore> {
  feed: Arc<F>,
  store: Arc<S>,
  metrics: Arc<MetricsRegistry>,
  /// Bets evaluated in parallel during a sweep.
  max_concurrent: usize,
}

impl<F: MatchFeed, S: BetStore> SettlementService<F, S> {
  pub fn new(
    feed: Arc<F>,
    store: Arc<S>,
    metrics: Arc<MetricsRegistry>,
    max_concurrent: usize,
  ) -> Self {
    Self {
      feed,
      store,
      metrics,
      max_concurrent: max_concurrent.max(1),
    }
  }

  /// Compute fresh verdicts for every undecided leg of `bet`.
  ///
  /// Never fails: a leg whose snapshot cannot be fetched simply gets no
  /// update and stays pending.
  #[instrument(skip(self, bet), fields(bet_id = %bet.id))]
  pub async fn evaluate(&self, bet: &Bet) -> BetEvaluation {
    self.metrics.polls.inc();

    let mut snapshots: HashMap<MatchId, Option<MatchSnapshot>> = HashMap::new();
    let mut legs = Vec::new();
    let mut statuses = Vec::with_capacity(bet.selections.len());
    let mut fetch_failures = 0;
    let mut unrecognized = 0;

    for (index, selection) in bet.selections.iter().enumerate() {
      if selection.is_decided() {
        statuses.push(selection.status());
        continue;
      }

      if !snapshots.contains_key(&selection.match_id) {
        let snap = self.fetch(selection.match_id).await;
        snapshots.insert(selection.match_id, snap);
      }

      let Some(Some(snapshot)) = snapshots.get(&selection.match_id) else {
        fetch_failures += 1;
        statuses.push(selection.status());
        continue;
      };

      let checked = selection.check(snapshot);
      if let Some(diagnostic) = &checked.diagnostic {
        unrecognized += 1;
        warn!(
          match_id = selection.match_id,
          label = %selection.market_label,
          error = %diagnostic,
          "Market label cannot be settled"
        );
        self
          .metrics
          .unrecognized_markets
          .with_label_values(&[diagnostic.reason()])
          .inc();
      }

      let has_goals = snapshot.home_goals.is_some() || snapshot.away_goals.is_some();
      statuses.push(checked.outcome.status());
      legs.push(LegUpdate {
        index,
        outcome: checked.outcome,
        score: has_goals.then(|| snapshot.score(selection.last_score)),
      });
    }

    BetEvaluation {
      update: BetUpdate {
        bet_id: bet.id,
        legs,
        checked_at: Utc::now(),
      },
      provisional_status: aggregate(statuses),
      fetch_failures,
      unrecognized,
    }
  }

  /// Evaluate a bet and apply the verdicts to the store.
  #[instrument(skip(self, bet), fields(bet_id = %bet.id, reference = %bet.reference))]
  pub async fn settle(&self, bet: &Bet) -> Result<SettlementTransition> {
    if bet.status.is_final() {
      return Ok(SettlementTransition::AlreadyFinal(bet.status));
    }

    let evaluation = self.evaluate(bet).await;
    let transition = self
      .store
      .apply_evaluation(&evaluation.update)
      .await
      .with_context(|| format!("Failed to apply evaluation for bet {}", bet.id))?;

    if !matches!(transition, SettlementTransition::AlreadyFinal(_)) {
      self.record_decided_legs(bet, &evaluation.update);
    }

    match &transition {
      SettlementTransition::Settled { status, credited } => {
        self
          .metrics
          .bets_settled
          .with_label_values(&[status.as_str()])
          .inc();
        if let Some(amount) = credited {
          self
            .metrics
            .winnings_credited
            .inc_by(amount.to_f64().unwrap_or_default());
        }
        info!(
          user_id = %bet.user_id,
          status = %status,
          credited = ?credited,
          "Bet settled"
        );
      }
      SettlementTransition::Progressed { newly_decided } => {
        debug!(newly_decided, "Bet progressed");
      }
      SettlementTransition::Unchanged => {
        debug!(
          fetch_failures = evaluation.fetch_failures,
          "Bet unchanged"
        );
      }
      SettlementTransition::AlreadyFinal(status) => {
        debug!(status = %status, "Bet already final");
      }
    }

    Ok(transition)
  }

  /// Settle a batch of bets with bounded concurrency.
  pub async fn sweep(&self, bets: Vec<Bet>) -> SettlementReport {
    let started = Instant::now();
    let count = bets.len();
    info!(bet_count = count, "Starting settlement sweep");

    let results: Vec<BetResult> = stream::iter(bets)
      .map(|bet| async move {
        match self.settle(&bet).await {
          Ok(transition) => BetResult {
            bet_id: bet.id,
            transition: Some(transition),
            error: None,
          },
          Err(e) => {
            warn!(bet_id = %bet.id, error = %e, "Failed to settle bet");
            BetResult {
              bet_id: bet.id,
              transition: None,
              error: Some(format!("{e:#}")),
            }
          }
        }
      })
      .buffer_unordered(self.max_concurrent)
      .collect()
      .await;

    let report = SettlementReport::from_results(results);
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    self.metrics.sweep_duration_ms.observe(elapsed_ms);

    info!(
      checked = count,
      won = report.bets_won,
      lost = report.bets_lost,
      failed = report.bets_failed,
      credited = %report.total_credited,
      elapsed_ms,
      "Settlement sweep complete"
    );

    report
  }

  async fn fetch(&self, match_id: MatchId) -> Option<MatchSnapshot> {
    let started = Instant::now();
    let result = self.feed.snapshot(match_id).await;
    self
      .metrics
      .snapshot_latency_ms
      .observe(started.elapsed().as_secs_f64() * 1000.0);

    match result {
      Ok(snapshot) => {
        self.metrics.snapshot_requests.with_label_values(&["ok"]).inc();
        Some(snapshot)
      }
      Err(e) => {
        self.metrics.snapshot_requests.with_label_values(&["error"]).inc();
        warn!(match_id, error = %e, "Snapshot unavailable, leg stays pending");
        None
      }
    }
  }

  fn record_decided_legs(&self, bet: &Bet, update: &BetUpdate) {
    for leg in update.legs.iter().filter(|l| l.outcome.is_decided()) {
      let Some(selection) = bet.selections.get(leg.index) else {
        continue;
      };
      let kind = selection.market.map_or("unknown", |m| m.kind());
      self
        .metrics
        .selections_decided
        .with_label_values(&[kind, leg.outcome.status().as_str()])
        .inc();
    }
  }
}
