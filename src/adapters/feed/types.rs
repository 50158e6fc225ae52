//! Feed Wire Types - Match Details Payload
//!
//! Mirrors the subset of the scores feed's match document that settlement
//! reads. Every field is optional on the wire; absence is resolved by the
//! domain (missing goals fall back, missing status means not started).

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::snapshot::{LifecycleStatus, MatchSnapshot};

/// Match document, either bare or wrapped as `{ "match": { ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchDetails {
    #[serde(default)]
    pub info_dynamic: Option<InfoDynamic>,
}

/// Live part of the match document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoDynamic {
    /// 0 = not started, 1 = live, 2 = ended, 3 = closed.
    #[serde(default)]
    pub event_status: Option<i64>,
    #[serde(default)]
    pub competition_status: Option<CompetitionStatus>,
    #[serde(default)]
    pub score: Option<ScoreWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitionStatus {
    #[serde(default)]
    pub name: Option<LocalizedName>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedName {
    #[serde(default)]
    pub en: Option<String>,
}

/// Home/away goal counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreWire {
    #[serde(default)]
    pub h: Option<u32>,
    #[serde(default)]
    pub a: Option<u32>,
}

impl From<MatchDetails> for MatchSnapshot {
    fn from(details: MatchDetails) -> Self {
        let info = details.info_dynamic.unwrap_or_default();
        let score = info.score.unwrap_or_default();

        Self {
            home_goals: score.h,
            away_goals: score.a,
            lifecycle: LifecycleStatus::from_code(info.event_status),
            status_label: info
                .competition_status
                .and_then(|c| c.name)
                .and_then(|n| n.en),
        }
    }
}

/// Decode a match-details response body into a snapshot.
pub fn parse_match_details(body: &str) -> Result<MatchSnapshot> {
    let mut value: Value =
        serde_json::from_str(body).context("Match details body is not JSON")?;

    let nested = value
        .get_mut("match")
        .map(Value::take)
        .filter(|m| !m.is_null());
    let document = nested.unwrap_or(value);

    let details: MatchDetails =
        serde_json::from_value(document).context("Unexpected match details shape")?;

    Ok(details.into())
}
