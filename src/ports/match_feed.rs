//! Match Feed Port - Live Match State Interface
//!
//! Defines the trait for fetching the current state of a football match
//! from the third-party odds/scores feed. Settlement only needs a fresh
//! snapshot per poll; transport, retries and rate limiting belong to the
//! adapter.

use async_trait::async_trait;

use crate::domain::bet::MatchId;
use crate::domain::snapshot::MatchSnapshot;

/// Trait for live match data providers.
#[async_trait]
pub trait MatchFeed: Send + Sync + 'static {
  /// Fetch the current snapshot for a match.
  ///
  /// Errors are transient from the settlement point of view: the caller
  /// treats the affected selection as undecided for this poll.
  async fn snapshot(&self, match_id: MatchId) -> anyhow::Result<MatchSnapshot>;

  /// Check if the feed is reachable.
  async fn is_healthy(&self) -> bool;
}
