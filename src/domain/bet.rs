//! Bet slips, placed bets and wallet transactions.
//!
//! A `BetSlip` is the mutable, pre-placement list of picks. Placing it
//! resolves every label into a `Market` and freezes the legs into a `Bet`;
//! from then on only leg outcomes and the overall status change.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::market::{Market, MarketParseError};
use super::outcome::{BetStatus, SelectionOutcome, SelectionStatus};
use super::snapshot::{MatchSnapshot, Score};
use super::validator::{validate, validate_label, LabelValidation};

// ────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────

/// Feed-assigned match identifier.
pub type MatchId = u64;

/// Account identifier from the auth provider.
pub type UserId = String;

/// Internal bet identifier.
pub type BetId = Uuid;

/// How long bet and transaction records are retained.
const RETENTION_DAYS: i64 = 5 * 365;

// ────────────────────────────────────────────
// Limits and errors
// ────────────────────────────────────────────

/// Stake and odds bounds applied at placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BettingLimits {
    /// Smallest accepted stake.
    pub min_stake: Decimal,
    /// Largest accepted stake.
    pub max_stake: Decimal,
    /// Cap on the accumulated odds of a slip.
    pub max_total_odds: Decimal,
}

impl Default for BettingLimits {
    fn default() -> Self {
        Self {
            min_stake: dec!(1),
            max_stake: dec!(10000000),
            max_total_odds: dec!(1000),
        }
    }
}

/// Reasons a slip cannot be edited or placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlipError {
    #[error("bet slip has no selections")]
    EmptySlip,

    #[error("stake {stake} outside allowed range {min}..={max}")]
    StakeOutOfRange {
        stake: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("total odds {total} would exceed the limit of {max}")]
    OddsLimitExceeded { total: Decimal, max: Decimal },

    #[error("odd {odd} for match {match_id} is not a valid decimal price")]
    InvalidOdd { match_id: MatchId, odd: Decimal },

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    #[error(transparent)]
    UnresolvedMarket(#[from] MarketParseError),
}

// ────────────────────────────────────────────
// Bet slip
// ────────────────────────────────────────────

/// One pick on the slip, exactly as displayed by the odds board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipEntry {
    pub match_id: MatchId,
    pub home_team: String,
    pub away_team: String,
    /// Market label or canonical identifier (e.g. `"X2"`, `"OU-OVER-2.5"`).
    pub market_label: String,
    /// Decimal odd offered when the pick was added.
    pub odd: Decimal,
}

/// Result of toggling a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlipToggle {
    Added,
    Removed,
}

/// Pre-placement accumulator.
#[derive(Debug, Clone)]
pub struct BetSlip {
    entries: Vec<SlipEntry>,
    max_total_odds: Decimal,
}

impl BetSlip {
    pub fn new(limits: &BettingLimits) -> Self {
        Self {
            entries: Vec::new(),
            max_total_odds: limits.max_total_odds,
        }
    }

    /// Add the pick, or remove it if the same match/market is already on
    /// the slip. Adding is refused when the accumulated odds would exceed
    /// the limit.
    pub fn toggle(&mut self, entry: SlipEntry) -> Result<SlipToggle, SlipError> {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.match_id == entry.match_id && e.market_label == entry.market_label)
        {
            self.entries.remove(pos);
            return Ok(SlipToggle::Removed);
        }

        if entry.odd < Decimal::ONE {
            return Err(SlipError::InvalidOdd {
                match_id: entry.match_id,
                odd: entry.odd,
            });
        }

        let total = self
            .total_odds()
            .checked_mul(entry.odd)
            .unwrap_or(Decimal::MAX);
        if total > self.max_total_odds {
            return Err(SlipError::OddsLimitExceeded {
                total,
                max: self.max_total_odds,
            });
        }

        self.entries.push(entry);
        Ok(SlipToggle::Added)
    }

    /// Whether a match/market pair is on the slip.
    pub fn contains(&self, match_id: MatchId, market_label: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.match_id == match_id && e.market_label == market_label)
    }

    /// Product of all odds on the slip (1 when empty). Saturates at
    /// `Decimal::MAX`.
    pub fn total_odds(&self) -> Decimal {
        self.entries
            .iter()
            .fold(Decimal::ONE, |acc, e| acc.saturating_mul(e.odd))
    }

    /// Stake times total odds, rounded to cents.
    pub fn potential_returns(&self, stake: Decimal) -> Decimal {
        stake.saturating_mul(self.total_odds().round_dp(2)).round_dp(2)
    }

    pub fn entries(&self) -> &[SlipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ────────────────────────────────────────────
// Placed bet
// ────────────────────────────────────────────

/// One leg of a placed bet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub match_id: MatchId,
    pub match_name: String,
    pub home_team: String,
    pub away_team: String,
    /// Label shown to the user; display only.
    pub market_label: String,
    /// Market resolved at placement; drives settlement. Records written
    /// without one are settled from `market_label` instead.
    #[serde(default)]
    pub market: Option<Market>,
    /// Odd recorded at placement.
    pub odd: Decimal,
    /// Latest outcome. Once decided it is never replaced.
    #[serde(default)]
    pub outcome: SelectionOutcome,
    /// Last score seen for this match, used when the feed omits goals.
    #[serde(default)]
    pub last_score: Option<Score>,
}

impl Selection {
    /// Freeze a slip entry, resolving its market.
    pub fn from_entry(entry: &SlipEntry) -> Result<Self, SlipError> {
        let market = Market::resolve(&entry.market_label)?;
        Ok(Self {
            match_id: entry.match_id,
            match_name: format!("{} vs {}", entry.home_team, entry.away_team),
            home_team: entry.home_team.clone(),
            away_team: entry.away_team.clone(),
            market_label: entry.market_label.clone(),
            market: Some(market),
            odd: entry.odd,
            outcome: SelectionOutcome::pending(),
            last_score: None,
        })
    }

    pub fn status(&self) -> SelectionStatus {
        self.outcome.status()
    }

    pub fn is_decided(&self) -> bool {
        self.outcome.is_decided()
    }

    /// Run this leg's market rule against a snapshot, using the last seen
    /// score for any goals the snapshot omits.
    pub fn check(&self, snapshot: &MatchSnapshot) -> LabelValidation {
        match &self.market {
            Some(market) => LabelValidation {
                outcome: validate(market, snapshot, self.last_score),
                diagnostic: None,
            },
            None => validate_label(&self.market_label, snapshot, self.last_score),
        }
    }
}

/// A placed accumulator bet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    /// Human-facing reference, `BET<unix millis>`.
    pub reference: String,
    pub user_id: UserId,
    pub selections: Vec<Selection>,
    /// Product of leg odds, rounded to 2 dp.
    pub total_odds: Decimal,
    pub stake: Decimal,
    /// Stake times total odds; credited in full on a win.
    pub potential_returns: Decimal,
    pub status: BetStatus,
    pub winnings_credited: bool,
    #[serde(default)]
    pub winnings_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub version: u32,
}

impl Bet {
    /// Build a pending bet from frozen selections.
    pub fn new(
        user_id: UserId,
        selections: Vec<Selection>,
        stake: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let total_odds = selections
            .iter()
            .fold(Decimal::ONE, |acc, s| acc.saturating_mul(s.odd))
            .round_dp(2);

        Self {
            id: Uuid::new_v4(),
            reference: format!("BET{}", now.timestamp_millis()),
            user_id,
            selections,
            total_odds,
            stake,
            potential_returns: stake.saturating_mul(total_odds).round_dp(2),
            status: BetStatus::Pending,
            winnings_credited: false,
            winnings_amount: None,
            created_at: now,
            updated_at: now,
            last_checked_at: None,
            expires_at: now + Duration::days(RETENTION_DAYS),
            version: 1,
        }
    }

    /// Leg statuses in slip order.
    pub fn statuses(&self) -> impl Iterator<Item = SelectionStatus> + '_ {
        self.selections.iter().map(Selection::status)
    }

    /// Whether every leg has a final verdict.
    pub fn all_decided(&self) -> bool {
        self.selections.iter().all(Selection::is_decided)
    }
}

// ────────────────────────────────────────────
// Wallet transactions
// ────────────────────────────────────────────

/// Kind of balance movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Stake debited at placement.
    Bet,
    /// Returns credited on a won bet.
    Winnings,
}

/// Audit record of a balance movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: UserId,
    pub bet_id: BetId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Transaction {
    /// Stake debit for a freshly placed bet.
    pub fn stake_debit(bet: &Bet, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: bet.user_id.clone(),
            bet_id: bet.id,
            kind: TransactionKind::Bet,
            amount: bet.stake,
            description: format!(
                "Bet placed: {} selection(s) - Total odds: {}",
                bet.selections.len(),
                bet.total_odds
            ),
            timestamp: now,
            expires_at: now + Duration::days(RETENTION_DAYS),
        }
    }

    /// Winnings credit for a bet that just won.
    pub fn winnings_credit(bet: &Bet, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: bet.user_id.clone(),
            bet_id: bet.id,
            kind: TransactionKind::Winnings,
            amount: bet.potential_returns,
            description: format!("Winnings from bet {}", bet.reference),
            timestamp: now,
            expires_at: now + Duration::days(RETENTION_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::ResultPick;
    use crate::domain::snapshot::LifecycleStatus;

    fn entry(match_id: MatchId, label: &str, odd: Decimal) -> SlipEntry {
        SlipEntry {
            match_id,
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            market_label: label.to_string(),
            odd,
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut slip = BetSlip::new(&BettingLimits::default());
        assert_eq!(slip.toggle(entry(1, "1", dec!(2.10))), Ok(SlipToggle::Added));
        assert!(slip.contains(1, "1"));
        assert_eq!(slip.toggle(entry(1, "1", dec!(2.10))), Ok(SlipToggle::Removed));
        assert!(slip.is_empty());
    }

    #[test]
    fn test_toggle_refuses_odds_above_limit() {
        let mut slip = BetSlip::new(&BettingLimits::default());
        slip.toggle(entry(1, "1", dec!(50))).unwrap();
        slip.toggle(entry(2, "1", dec!(10))).unwrap();
        let err = slip.toggle(entry(3, "2", dec!(3))).unwrap_err();
        assert!(matches!(err, SlipError::OddsLimitExceeded { .. }));
        assert_eq!(slip.len(), 2);
        // Removal is always allowed.
        assert_eq!(slip.toggle(entry(2, "1", dec!(10))), Ok(SlipToggle::Removed));
    }

    #[test]
    fn test_toggle_refuses_overflowing_odd() {
        let mut slip = BetSlip::new(&BettingLimits::default());
        slip.toggle(entry(1, "1", dec!(2))).unwrap();
        let err = slip.toggle(entry(2, "1", Decimal::MAX)).unwrap_err();
        assert_eq!(
            err,
            SlipError::OddsLimitExceeded {
                total: Decimal::MAX,
                max: BettingLimits::default().max_total_odds,
            }
        );
        assert_eq!(slip.total_odds(), dec!(2));
    }

    #[test]
    fn test_bet_new_saturates_huge_odds() {
        let legs = vec![
            Selection::from_entry(&entry(1, "1", Decimal::MAX)).unwrap(),
            Selection::from_entry(&entry(2, "2", dec!(3))).unwrap(),
        ];
        let bet = Bet::new("u1".to_string(), legs, dec!(10), Utc::now());
        assert_eq!(bet.total_odds, Decimal::MAX);
        assert_eq!(bet.potential_returns, Decimal::MAX);
    }

    #[test]
    fn test_toggle_rejects_sub_unit_odd() {
        let mut slip = BetSlip::new(&BettingLimits::default());
        let err = slip.toggle(entry(1, "1", dec!(0.5))).unwrap_err();
        assert!(matches!(err, SlipError::InvalidOdd { match_id: 1, .. }));
    }

    #[test]
    fn test_potential_returns() {
        let mut slip = BetSlip::new(&BettingLimits::default());
        slip.toggle(entry(1, "1", dec!(1.5))).unwrap();
        slip.toggle(entry(2, "Over 2.5", dec!(2.0))).unwrap();
        assert_eq!(slip.total_odds(), dec!(3.0));
        assert_eq!(slip.potential_returns(dec!(1000)), dec!(3000));
    }

    #[test]
    fn test_selection_resolves_market() {
        let sel = Selection::from_entry(&entry(7, "1X2-1", dec!(1.8))).unwrap();
        assert_eq!(sel.market, Some(Market::MatchResult(ResultPick::Home)));
        assert_eq!(sel.match_name, "Arsenal vs Chelsea");
        assert!(!sel.is_decided());

        let err = Selection::from_entry(&entry(7, "Corner Kicks Exact", dec!(1.8))).unwrap_err();
        assert!(matches!(err, SlipError::UnresolvedMarket(_)));
    }

    #[test]
    fn test_check_falls_back_to_label() {
        let mut sel = Selection::from_entry(&entry(7, "Over 1.5", dec!(1.4))).unwrap();
        let live = MatchSnapshot::new(1, 1, LifecycleStatus::Live);
        assert_eq!(sel.check(&live).outcome.status(), SelectionStatus::Won);

        sel.market = None;
        sel.market_label = "Asian Handicap -1".to_string();
        let v = sel.check(&live);
        assert!(!v.outcome.is_decided());
        assert!(v.diagnostic.is_some());
    }

    #[test]
    fn test_check_uses_last_score() {
        let mut sel = Selection::from_entry(&entry(7, "BTTS", dec!(1.9))).unwrap();
        sel.last_score = Some(Score::new(1, 2));
        let snap = MatchSnapshot {
            lifecycle: LifecycleStatus::Live,
            ..MatchSnapshot::default()
        };
        assert_eq!(sel.check(&snap).outcome.status(), SelectionStatus::Won);
    }

    #[test]
    fn test_bet_new_totals() {
        let now = Utc::now();
        let legs = vec![
            Selection::from_entry(&entry(1, "1", dec!(1.55))).unwrap(),
            Selection::from_entry(&entry(2, "BTTS", dec!(1.91))).unwrap(),
        ];
        let bet = Bet::new("user-1".to_string(), legs, dec!(1000), now);
        assert_eq!(bet.total_odds, dec!(2.96));
        assert_eq!(bet.potential_returns, dec!(2960));
        assert_eq!(bet.status, BetStatus::Pending);
        assert!(!bet.winnings_credited);
        assert_eq!(bet.reference, format!("BET{}", now.timestamp_millis()));
        assert!(!bet.all_decided());
    }

    #[test]
    fn test_transactions_mirror_bet() {
        let now = Utc::now();
        let legs = vec![Selection::from_entry(&entry(1, "X", dec!(3.2))).unwrap()];
        let bet = Bet::new("u".to_string(), legs, dec!(50), now);

        let debit = Transaction::stake_debit(&bet, now);
        assert_eq!(debit.kind, TransactionKind::Bet);
        assert_eq!(debit.amount, dec!(50));

        let credit = Transaction::winnings_credit(&bet, now);
        assert_eq!(credit.kind, TransactionKind::Winnings);
        assert_eq!(credit.amount, dec!(160));
        assert!(credit.description.contains(&bet.reference));
    }
}
