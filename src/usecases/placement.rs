//! Bet Placement Use Case - Slip to Placed Bet
//!
//! Validates a slip against the betting limits, freezes its picks into a
//! `Bet` and hands the bet and its stake debit to the store, which applies
//! both in one write.
//!
//! Library-only entry point: the settler binary never places bets. Front
//! ends build it with `config.betting.limits()` over the same store
//! the runner settles.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::domain::bet::{Bet, BetSlip, BettingLimits, Selection, SlipError, Transaction};
use crate::ports::bet_store::BetStore;

/// Places bets on behalf of users.
pub struct BetPlacement<S: BetStore> {
  store: Arc<S>,
  limits: BettingLimits,
}

impl<S: BetStore> BetPlacement<S> {
  pub fn new(store: Arc<S>, limits: BettingLimits) -> Self {
    Self { store, limits }
  }

  /// Check a slip and stake without touching the store.
  pub fn check(&self, slip: &BetSlip, stake: Decimal) -> Result<Vec<Selection>, SlipError> {
    if slip.is_empty() {
      return Err(SlipError::EmptySlip);
    }

    if stake < self.limits.min_stake || stake > self.limits.max_stake {
      return Err(SlipError::StakeOutOfRange {
        stake,
        min: self.limits.min_stake,
        max: self.limits.max_stake,
      });
    }

    let total = slip.total_odds();
    if total > self.limits.max_total_odds {
      return Err(SlipError::OddsLimitExceeded {
        total,
        max: self.limits.max_total_odds,
      });
    }

    slip.entries().iter().map(Selection::from_entry).collect()
  }

  /// Place `slip` for `user_id` with `stake`.
  ///
  /// Fails with a [`SlipError`] for an invalid slip or an uncovered stake;
  /// the store re-checks the balance under its own lock.
  #[instrument(skip(self, slip), fields(legs = slip.len()))]
  pub async fn place(&self, user_id: &str, slip: &BetSlip, stake: Decimal) -> Result<Bet> {
    let selections = self.check(slip, stake)?;

    let available = self
      .store
      .balance(user_id)
      .await
      .context("Failed to read balance")?;
    if available < stake {
      return Err(SlipError::InsufficientBalance {
        needed: stake,
        available,
      }
      .into());
    }

    let now = Utc::now();
    let bet = Bet::new(user_id.to_string(), selections, stake, now);
    let debit = Transaction::stake_debit(&bet, now);

    let remaining = self.store.place_bet(&bet, &debit).await?;

    info!(
      bet_id = %bet.id,
      reference = %bet.reference,
      total_odds = %bet.total_odds,
      potential_returns = %bet.potential_returns,
      balance = %remaining,
      "Bet accepted"
    );

    Ok(bet)
  }
}
