//! Bet Store Port - Bets, Balances and Transactions
//!
//! Defines the persistence boundary for placed bets. The store owns the
//! state transitions that move money: placing a bet debits the stake, and
//! a bet moving from pending to won credits its returns. Both happen inside
//! the store's own critical section so that concurrent pollers can never
//! double-debit or double-credit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::bet::{Bet, BetId, Transaction};
use crate::domain::outcome::{BetStatus, SelectionOutcome};
use crate::domain::snapshot::Score;

/// Store-level failures callers may want to match on.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("bet not found: {0}")]
  BetNotFound(BetId),

  #[error("bet already exists: {0}")]
  DuplicateBet(BetId),

  #[error("insufficient balance: need {needed}, have {available}")]
  InsufficientBalance { needed: Decimal, available: Decimal },
}

/// Fresh verdict for one leg, addressed by its index in the bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegUpdate {
  /// Position of the selection within `Bet::selections`.
  pub index: usize,
  /// Outcome computed from the latest snapshot.
  pub outcome: SelectionOutcome,
  /// Score seen in that snapshot, if any.
  pub score: Option<Score>,
}

/// Result of one evaluation pass over a bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetUpdate {
  pub bet_id: BetId,
  pub legs: Vec<LegUpdate>,
  pub checked_at: DateTime<Utc>,
}

/// What `apply_evaluation` did to the stored bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementTransition {
  /// Bet is still pending and no leg changed.
  Unchanged,
  /// Bet is still pending; some legs were newly decided.
  Progressed { newly_decided: usize },
  /// Bet left pending in this call. `credited` is set for a win.
  Settled {
    status: BetStatus,
    credited: Option<Decimal>,
  },
  /// Bet had already left pending before this call; nothing was written.
  AlreadyFinal(BetStatus),
}

impl SettlementTransition {
  /// Whether the bet no longer needs polling.
  pub fn is_final(&self) -> bool {
    matches!(self, Self::Settled { .. } | Self::AlreadyFinal(_))
  }
}

/// Trait for bet persistence providers.
#[async_trait]
pub trait BetStore: Send + Sync + 'static {
  /// Current balance of a user (zero for unknown users).
  async fn balance(&self, user_id: &str) -> anyhow::Result<Decimal>;

  /// Persist a new bet, debit its stake and record the debit, atomically.
  ///
  /// Returns the balance after the debit. Fails with
  /// [`StoreError::InsufficientBalance`] without writing anything if the
  /// user cannot cover the stake.
  async fn place_bet(&self, bet: &Bet, debit: &Transaction) -> anyhow::Result<Decimal>;

  /// Load a single bet.
  async fn get_bet(&self, bet_id: BetId) -> anyhow::Result<Option<Bet>>;

  /// All bets whose status is still pending.
  async fn open_bets(&self) -> anyhow::Result<Vec<Bet>>;

  /// Merge fresh leg verdicts into a stored bet and advance its status.
  ///
  /// Decided legs are never overwritten. The overall status is recomputed
  /// from the merged legs; a pending → won move credits the bet's returns
  /// exactly once and records a winnings transaction in the same write.
  async fn apply_evaluation(&self, update: &BetUpdate) -> anyhow::Result<SettlementTransition>;

  /// Transaction history of a user, oldest first.
  async fn transactions(&self, user_id: &str) -> anyhow::Result<Vec<Transaction>>;

  /// Check if the store is readable and writable.
  async fn is_healthy(&self) -> bool;
}
