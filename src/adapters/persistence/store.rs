//! File Bet Store - Concrete Adapter for the BetStore Port
//!
//! Combines `LedgerFile` (atomic JSON) and `TransactionLog` (JSONL) behind
//! a single async mutex. Every mutation is applied to a copy of the ledger,
//! written to disk, and only then swapped into memory, so a failed write
//! leaves both the file and the in-memory state untouched.
//!
//! The ledger is the source of truth. Once a commit lands, a failed
//! transaction-log append is logged and the operation still succeeds.
//! Final bets past `expires_at` are dropped on the next commit.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::ledger::{Ledger, LedgerFile};
use super::transactions::TransactionLog;
use crate::domain::bet::{Bet, BetId, Transaction};
use crate::domain::outcome::{aggregate, BetStatus};
use crate::ports::bet_store::{BetStore, BetUpdate, SettlementTransition, StoreError};

/// JSON-file backed store for bets, balances and transactions.
pub struct FileBetStore {
    ledger_file: LedgerFile,
    tx_log: TransactionLog,
    state: Mutex<Ledger>,
}

impl FileBetStore {
    /// Open (or create) a store rooted at `data_dir`.
    pub async fn from_data_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = data_dir.as_ref();
        let ledger_file = LedgerFile::new(dir).await?;
        let tx_log = TransactionLog::new(dir).await?;
        let ledger = ledger_file.load().await?;

        Ok(Self {
            ledger_file,
            tx_log,
            state: Mutex::new(ledger),
        })
    }

    /// Credit funds to a wallet outside of betting (top-ups, seeding).
    /// Exposed for embedding front ends; the settler binary never calls it.
    #[instrument(skip(self))]
    pub async fn deposit(&self, user_id: &str, amount: Decimal) -> Result<Decimal> {
        anyhow::ensure!(amount > Decimal::ZERO, "deposit must be positive");

        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let balance = next.balances.entry(user_id.to_string()).or_default();
        *balance += amount;
        let new_balance = *balance;

        self.commit(&mut state, next).await?;
        info!(user_id, %amount, balance = %new_balance, "Deposit recorded");
        Ok(new_balance)
    }

    async fn commit(&self, state: &mut Ledger, mut next: Ledger) -> Result<()> {
        let purged = purge_expired(&mut next, Utc::now());
        if purged > 0 {
            debug!(purged, "Expired final bets dropped from ledger");
        }
        next.version = state.version + 1;
        self.ledger_file.save(&next).await?;
        *state = next;
        Ok(())
    }

    /// Audit-log a movement that the ledger already holds.
    async fn record(&self, tx: &Transaction) {
        if let Err(e) = self.tx_log.append(tx).await {
            error!(
                tx_id = %tx.id,
                user_id = %tx.user_id,
                amount = %tx.amount,
                error = %e,
                "Ledger committed but transaction log append failed"
            );
        }
    }
}

/// Drop settled bets whose retention window has passed. Returns how many
/// were removed.
fn purge_expired(ledger: &mut Ledger, now: DateTime<Utc>) -> usize {
    let before = ledger.bets.len();
    ledger
        .bets
        .retain(|_, b| !(b.status.is_final() && b.expires_at <= now));
    before - ledger.bets.len()
}

#[async_trait]
impl BetStore for FileBetStore {
    async fn balance(&self, user_id: &str) -> Result<Decimal> {
        Ok(self.state.lock().await.balance(user_id))
    }

    #[instrument(skip(self, bet, debit), fields(bet_id = %bet.id, user_id = %bet.user_id))]
    async fn place_bet(&self, bet: &Bet, debit: &Transaction) -> Result<Decimal> {
        let mut state = self.state.lock().await;

        if state.bets.contains_key(&bet.id) {
            return Err(StoreError::DuplicateBet(bet.id).into());
        }

        let available = state.balance(&bet.user_id);
        if available < bet.stake {
            return Err(StoreError::InsufficientBalance {
                needed: bet.stake,
                available,
            }
            .into());
        }

        let mut next = state.clone();
        let remaining = available - bet.stake;
        next.balances.insert(bet.user_id.clone(), remaining);
        next.bets.insert(bet.id, bet.clone());

        self.commit(&mut state, next).await?;
        self.record(debit).await;

        info!(
            reference = %bet.reference,
            stake = %bet.stake,
            legs = bet.selections.len(),
            balance = %remaining,
            "Bet placed"
        );
        Ok(remaining)
    }

    async fn get_bet(&self, bet_id: BetId) -> Result<Option<Bet>> {
        Ok(self.state.lock().await.bets.get(&bet_id).cloned())
    }

    async fn open_bets(&self) -> Result<Vec<Bet>> {
        let state = self.state.lock().await;
        Ok(state
            .bets
            .values()
            .filter(|b| b.status == BetStatus::Pending)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, update), fields(bet_id = %update.bet_id))]
    async fn apply_evaluation(&self, update: &BetUpdate) -> Result<SettlementTransition> {
        let mut state = self.state.lock().await;

        let mut bet = state
            .bets
            .get(&update.bet_id)
            .cloned()
            .ok_or(StoreError::BetNotFound(update.bet_id))?;

        if bet.status.is_final() {
            return Ok(SettlementTransition::AlreadyFinal(bet.status));
        }

        let mut newly_decided = 0;
        let mut touched = false;

        for leg in &update.legs {
            let Some(selection) = bet.selections.get_mut(leg.index) else {
                warn!(index = leg.index, "Leg update addresses a missing selection");
                continue;
            };

            if leg.score.is_some() && selection.last_score != leg.score {
                selection.last_score = leg.score;
                touched = true;
            }

            // Decided legs are frozen.
            if selection.is_decided() || selection.outcome == leg.outcome {
                continue;
            }
            if leg.outcome.is_decided() {
                newly_decided += 1;
            }
            selection.outcome = leg.outcome.clone();
            touched = true;
        }

        let status = aggregate(bet.statuses());

        if status == BetStatus::Pending && !touched {
            // Only the check timestamp moved; keep it in memory.
            if let Some(stored) = state.bets.get_mut(&update.bet_id) {
                stored.last_checked_at = Some(update.checked_at);
            }
            return Ok(SettlementTransition::Unchanged);
        }

        bet.last_checked_at = Some(update.checked_at);
        bet.updated_at = update.checked_at;
        bet.version += 1;

        let mut credit = None;
        match status {
            BetStatus::Pending => {}
            BetStatus::Lost => bet.status = BetStatus::Lost,
            BetStatus::Won => {
                bet.status = BetStatus::Won;
                if !bet.winnings_credited {
                    bet.winnings_credited = true;
                    bet.winnings_amount = Some(bet.potential_returns);
                    credit = Some(Transaction::winnings_credit(&bet, Utc::now()));
                }
            }
        }

        let mut next = state.clone();
        if let Some(tx) = &credit {
            *next.balances.entry(tx.user_id.clone()).or_default() += tx.amount;
        }
        next.bets.insert(bet.id, bet);

        self.commit(&mut state, next).await?;

        if let Some(tx) = &credit {
            self.record(tx).await;
            info!(bet_id = %update.bet_id, amount = %tx.amount, "Winnings credited");
        }

        Ok(match status {
            BetStatus::Pending => SettlementTransition::Progressed { newly_decided },
            status => SettlementTransition::Settled {
                status,
                credited: credit.map(|tx| tx.amount),
            },
        })
    }

    async fn transactions(&self, user_id: &str) -> Result<Vec<Transaction>> {
        self.tx_log.load_for_user(user_id).await
    }

    async fn is_healthy(&self) -> bool {
        self.ledger_file.is_healthy().await && self.tx_log.is_healthy().await
    }
}
