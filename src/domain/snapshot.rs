//! Match state as reported by the live feed.
//!
//! A `MatchSnapshot` is the only view of a football match the settlement
//! engine ever sees: two goal counters, a coarse lifecycle code and the
//! competition-status label. Snapshots are fetched fresh on every poll and
//! never mutated.

use serde::{Deserialize, Serialize};

/// Labels that mark a finished match when the status code is unreliable.
const ENDED_LABEL_MARKERS: [&str; 4] = ["ended", "finished", "fulltime", "full-time"];

/// Coarse lifecycle state of a match.
///
/// The feed encodes this as a small integer; unknown codes are kept
/// verbatim and treated as "not ended".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifecycleStatus {
    /// Code 0, also used when the code is absent.
    #[default]
    NotStarted,
    /// Code 1.
    Live,
    /// Code 2.
    Ended,
    /// Code 3.
    Closed,
    /// Any other code the feed may introduce.
    Other(i64),
}

impl LifecycleStatus {
    /// Map the feed's numeric `event_status` to a lifecycle state.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            None | Some(0) => Self::NotStarted,
            Some(1) => Self::Live,
            Some(2) => Self::Ended,
            Some(3) => Self::Closed,
            Some(other) => Self::Other(other),
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Closed)
    }
}

/// A resolved scoreline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    /// Goals scored by the home side.
    pub home: u32,
    /// Goals scored by the away side.
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Total goals in the match so far.
    pub fn total(self) -> u32 {
        self.home.saturating_add(self.away)
    }

    /// Whether both sides have scored at least once.
    pub fn both_scored(self) -> bool {
        self.home > 0 && self.away > 0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

/// Point-in-time view of a match from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Home goals, if the feed reported them.
    pub home_goals: Option<u32>,
    /// Away goals, if the feed reported them.
    pub away_goals: Option<u32>,
    /// Lifecycle state decoded from the status code.
    pub lifecycle: LifecycleStatus,
    /// Human-readable competition status (e.g. "Ended", "2nd half").
    pub status_label: Option<String>,
}

impl MatchSnapshot {
    /// Snapshot with a known score and lifecycle, no label.
    pub fn new(home_goals: u32, away_goals: u32, lifecycle: LifecycleStatus) -> Self {
        Self {
            home_goals: Some(home_goals),
            away_goals: Some(away_goals),
            lifecycle,
            status_label: None,
        }
    }

    /// Attach a competition-status label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.status_label = Some(label.into());
        self
    }

    /// Whether the match has reached a final state.
    ///
    /// The status code is authoritative when terminal; otherwise the label
    /// is consulted as a fallback for feeds that lag on the code.
    pub fn is_ended(&self) -> bool {
        if self.lifecycle.is_terminal() {
            return true;
        }

        self.status_label.as_deref().is_some_and(|label| {
            let label = label.to_lowercase();
            ENDED_LABEL_MARKERS
                .iter()
                .any(|marker| label.contains(marker))
        })
    }

    /// Resolve the scoreline, field by field: feed value, then the caller's
    /// fallback, then zero.
    pub fn score(&self, fallback: Option<Score>) -> Score {
        Score {
            home: self
                .home_goals
                .or(fallback.map(|s| s.home))
                .unwrap_or(0),
            away: self
                .away_goals
                .or(fallback.map(|s| s.away))
                .unwrap_or(0),
        }
    }
}
