//! Poll Scheduler - Per-bet Polling Cadence
//!
//! Decides which open bets are due for a fresh evaluation. Each bet is
//! polled at most once per `poll_interval`, and never twice within the
//! hard minimum gap, however the interval is configured. Bets that reach
//! a final status are retired and never polled again.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::domain::bet::BetId;

/// Polling bookkeeping for one bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
  pub last_polled: DateTime<Utc>,
  pub polls: u64,
}

/// Tracks when each open bet was last polled.
#[derive(Debug)]
pub struct PollScheduler {
  /// Effective spacing between polls of the same bet.
  interval: Duration,
  states: HashMap<BetId, PollState>,
  retired: HashSet<BetId>,
}

impl PollScheduler {
  /// `poll_interval` is raised to `min_gap` when configured below it.
  pub fn new(poll_interval: std::time::Duration, min_gap: std::time::Duration) -> Self {
    let interval = poll_interval.max(min_gap);
    Self {
      interval: Duration::from_std(interval).unwrap_or_else(|_| Duration::days(365)),
      states: HashMap::new(),
      retired: HashSet::new(),
    }
  }

  /// Whether `bet_id` should be polled at `now`.
  pub fn due(&self, bet_id: BetId, now: DateTime<Utc>) -> bool {
    if self.retired.contains(&bet_id) {
      return false;
    }
    self
      .states
      .get(&bet_id)
      .is_none_or(|s| now.signed_duration_since(s.last_polled) >= self.interval)
  }

  /// Mark a poll as started at `now`.
  pub fn record_poll(&mut self, bet_id: BetId, now: DateTime<Utc>) {
    let state = self.states.entry(bet_id).or_insert(PollState {
      last_polled: now,
      polls: 0,
    });
    state.last_polled = now;
    state.polls += 1;
  }

  /// Stop polling a bet that reached a final status.
  pub fn retire(&mut self, bet_id: BetId) {
    if let Some(state) = self.states.remove(&bet_id) {
      debug!(bet_id = %bet_id, polls = state.polls, "Bet retired from polling");
    }
    self.retired.insert(bet_id);
  }

  /// Drop bookkeeping for bets that are no longer open.
  pub fn forget_missing(&mut self, open: &HashSet<BetId>) {
    self.states.retain(|id, _| open.contains(id));
    self.retired.retain(|id| open.contains(id));
  }

  pub fn state(&self, bet_id: BetId) -> Option<PollState> {
    self.states.get(&bet_id).copied()
  }

  /// Number of bets currently tracked.
  pub fn tracked(&self) -> usize {
    self.states.len()
  }
}
