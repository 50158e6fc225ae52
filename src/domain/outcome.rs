//! Selection and bet outcomes.
//!
//! `SelectionOutcome` can only be built through its constructors so that
//! an undecided outcome is always `Pending` and a decided one never is.

use serde::{Deserialize, Serialize};

/// Status of a single leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStatus {
    #[default]
    Pending,
    Won,
    Lost,
}

impl SelectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl std::fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall status of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    #[default]
    Pending,
    Won,
    Lost,
}

impl BetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    /// Whether the bet has left `Pending` for good.
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for BetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one selection against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionOutcome {
    status: SelectionStatus,
    decided: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl SelectionOutcome {
    /// Not decidable yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Not decidable, with a diagnostic note for audit display.
    pub fn pending_with(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn won(reason: impl Into<String>) -> Self {
        Self {
            status: SelectionStatus::Won,
            decided: true,
            reason: Some(reason.into()),
        }
    }

    pub fn lost(reason: impl Into<String>) -> Self {
        Self {
            status: SelectionStatus::Lost,
            decided: true,
            reason: Some(reason.into()),
        }
    }

    pub fn status(&self) -> SelectionStatus {
        self.status
    }

    pub fn is_decided(&self) -> bool {
        self.decided
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Reduce leg statuses to a bet status.
///
/// Any lost leg loses the bet immediately; the bet wins only when every leg
/// has won. A bet with no legs stays pending.
pub fn aggregate<I>(statuses: I) -> BetStatus
where
    I: IntoIterator<Item = SelectionStatus>,
{
    let mut any = false;
    let mut all_won = true;

    for status in statuses {
        any = true;
        match status {
            SelectionStatus::Lost => return BetStatus::Lost,
            SelectionStatus::Pending => all_won = false,
            SelectionStatus::Won => {}
        }
    }

    if any && all_won {
        BetStatus::Won
    } else {
        BetStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SelectionStatus::{Lost, Pending, Won};

    #[test]
    fn test_constructors_hold_invariant() {
        let p = SelectionOutcome::pending();
        assert_eq!(p.status(), Pending);
        assert!(!p.is_decided());

        let p = SelectionOutcome::pending_with("feed unavailable");
        assert!(!p.is_decided());
        assert_eq!(p.reason(), Some("feed unavailable"));

        assert!(SelectionOutcome::won("x").is_decided());
        assert_eq!(SelectionOutcome::lost("x").status(), Lost);
    }

    #[test]
    fn test_any_loss_dominates() {
        assert_eq!(aggregate([Won, Lost, Pending]), BetStatus::Lost);
        assert_eq!(aggregate([Pending, Pending, Lost]), BetStatus::Lost);
    }

    #[test]
    fn test_all_won() {
        assert_eq!(aggregate([Won, Won]), BetStatus::Won);
        assert_eq!(aggregate([Won]), BetStatus::Won);
    }

    #[test]
    fn test_mixed_pending() {
        assert_eq!(aggregate([Won, Pending]), BetStatus::Pending);
    }

    #[test]
    fn test_empty_stays_pending() {
        assert_eq!(aggregate(std::iter::empty()), BetStatus::Pending);
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(serde_json::to_string(&BetStatus::Won).unwrap(), "\"won\"");
        let s: SelectionStatus = serde_json::from_str("\"lost\"").unwrap();
        assert_eq!(s, Lost);
    }
}
