//! Market kinds a selection can be placed on.
//!
//! Markets are resolved once, when the bet is placed, into a tagged
//! `Market` value. Settlement then dispatches on the enum and never looks
//! at the free-text label again. Labels are still accepted as input because
//! the odds feed only hands out display strings such as `"X2"` or
//! `"Over 2.5"`; `Market::resolve` tries the canonical identifier first and
//! falls back to keyword routing.
//!
//! Canonical identifiers:
//! - `1X2-1`, `1X2-X`, `1X2-2`
//! - `DC-1X`, `DC-X2`, `DC-12`
//! - `OU-OVER-<line>`, `OU-UNDER-<line>`
//! - `BTTS-YES`, `BTTS-NO`

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a market label could not be turned into a `Market`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketParseError {
    /// No market family matched the label.
    #[error("unrecognized market: {0:?}")]
    Unrecognized(String),
    /// Over/Under label without a parseable goal line.
    #[error("no goal line in over/under market: {0:?}")]
    MissingLine(String),
    /// The family matched but the pick inside it did not.
    #[error("no selection in market label: {0:?}")]
    MissingSelection(String),
}

impl MarketParseError {
    /// The label that failed to parse.
    pub fn label(&self) -> &str {
        match self {
            Self::Unrecognized(l) | Self::MissingLine(l) | Self::MissingSelection(l) => l,
        }
    }

    /// Fixed name of the failure, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unrecognized(_) => "unrecognized",
            Self::MissingLine(_) => "missing_line",
            Self::MissingSelection(_) => "missing_selection",
        }
    }
}

/// Pick in a full-time result (1X2) market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultPick {
    Home,
    Draw,
    Away,
}

/// Pick in a double-chance market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoubleChancePick {
    /// 1X
    HomeOrDraw,
    /// X2
    DrawOrAway,
    /// 12
    HomeOrAway,
}

/// Side of a total-goals line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TotalSide {
    Over,
    Under,
}

/// A settled-upon market kind with its pick.
///
/// Serialized as the canonical identifier string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Market {
    MatchResult(ResultPick),
    DoubleChance(DoubleChancePick),
    TotalGoals { side: TotalSide, line: Decimal },
    BothTeamsToScore { yes: bool },
}

impl Market {
    /// Over `line` total goals.
    pub fn over(line: Decimal) -> Self {
        Self::TotalGoals {
            side: TotalSide::Over,
            line: line.normalize(),
        }
    }

    /// Under `line` total goals.
    pub fn under(line: Decimal) -> Self {
        Self::TotalGoals {
            side: TotalSide::Under,
            line: line.normalize(),
        }
    }

    /// Short family name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MatchResult(_) => "match_result",
            Self::DoubleChance(_) => "double_chance",
            Self::TotalGoals { .. } => "total_goals",
            Self::BothTeamsToScore { .. } => "btts",
        }
    }

    /// Canonical identifier, stable across label wording changes.
    pub fn canonical_id(&self) -> String {
        match self {
            Self::MatchResult(ResultPick::Home) => "1X2-1".to_string(),
            Self::MatchResult(ResultPick::Draw) => "1X2-X".to_string(),
            Self::MatchResult(ResultPick::Away) => "1X2-2".to_string(),
            Self::DoubleChance(DoubleChancePick::HomeOrDraw) => "DC-1X".to_string(),
            Self::DoubleChance(DoubleChancePick::DrawOrAway) => "DC-X2".to_string(),
            Self::DoubleChance(DoubleChancePick::HomeOrAway) => "DC-12".to_string(),
            Self::TotalGoals { side: TotalSide::Over, line } => format!("OU-OVER-{line}"),
            Self::TotalGoals { side: TotalSide::Under, line } => format!("OU-UNDER-{line}"),
            Self::BothTeamsToScore { yes: true } => "BTTS-YES".to_string(),
            Self::BothTeamsToScore { yes: false } => "BTTS-NO".to_string(),
        }
    }

    /// Parse a canonical identifier. Case-insensitive, surrounding
    /// whitespace ignored.
    pub fn from_canonical(id: &str) -> Option<Self> {
        let id = id.trim().to_uppercase();
        let market = match id.as_str() {
            "1X2-1" => Self::MatchResult(ResultPick::Home),
            "1X2-X" => Self::MatchResult(ResultPick::Draw),
            "1X2-2" => Self::MatchResult(ResultPick::Away),
            "DC-1X" => Self::DoubleChance(DoubleChancePick::HomeOrDraw),
            "DC-X2" => Self::DoubleChance(DoubleChancePick::DrawOrAway),
            "DC-12" => Self::DoubleChance(DoubleChancePick::HomeOrAway),
            "BTTS-YES" => Self::BothTeamsToScore { yes: true },
            "BTTS-NO" => Self::BothTeamsToScore { yes: false },
            other => {
                if let Some(line) = other.strip_prefix("OU-OVER-") {
                    Self::over(canonical_line(line)?)
                } else if let Some(line) = other.strip_prefix("OU-UNDER-") {
                    Self::under(canonical_line(line)?)
                } else {
                    return None;
                }
            }
        };
        Some(market)
    }

    /// Canonical identifier first, keyword routing second.
    /// A malformed `OU-` identifier is an error rather than a keyword
    /// match, so `OU-OVER--1` never settles as Over 1.
    pub fn resolve(label: &str) -> Result<Self, MarketParseError> {
        if let Some(market) = Self::from_canonical(label) {
            return Ok(market);
        }
        let upper = label.trim().to_uppercase();
        if upper.starts_with("OU-OVER-") || upper.starts_with("OU-UNDER-") {
            return Err(MarketParseError::MissingLine(label.to_string()));
        }
        Self::from_label(label)
    }

    /// Route a free-text label to a market family by keyword.
    ///
    /// Families are tried in order (first match wins):
    /// over/under, both-teams-to-score, double chance, full-time result.
    /// Labels mentioning `1x2` skip the double-chance family since `1x`
    /// is a substring of them.
    pub fn from_label(label: &str) -> Result<Self, MarketParseError> {
        let lower = label.trim().to_lowercase();
        let has = |needle: &str| lower.contains(needle);

        if lower.is_empty() {
            return Err(MarketParseError::Unrecognized(label.to_string()));
        }

        if has("over") || has("under") {
            let line = extract_line(&lower)
                .ok_or_else(|| MarketParseError::MissingLine(label.to_string()))?;
            return Ok(if has("over") {
                Self::over(line)
            } else {
                Self::under(line)
            });
        }

        if has("btts") || has("gg") || has("ng") || has("both teams to score") {
            if has("yes") || has("gg") || lower == "btts" {
                return Ok(Self::BothTeamsToScore { yes: true });
            }
            if has("no") || has("ng") {
                return Ok(Self::BothTeamsToScore { yes: false });
            }
            return Err(MarketParseError::MissingSelection(label.to_string()));
        }

        if !has("1x2") && (has("1x") || has("x2") || has("12") || has("double chance")) {
            let pick = if has("1x") {
                DoubleChancePick::HomeOrDraw
            } else if has("x2") || lower == "2x" {
                DoubleChancePick::DrawOrAway
            } else if has("12") {
                DoubleChancePick::HomeOrAway
            } else {
                return Err(MarketParseError::MissingSelection(label.to_string()));
            };
            return Ok(Self::DoubleChance(pick));
        }

        if has("1x2")
            || matches!(lower.as_str(), "1" | "x" | "2")
            || has("home")
            || has("draw")
            || has("away")
        {
            let pick = if lower == "1" || lower == "1x2-1" || has("home") {
                ResultPick::Home
            } else if lower == "x" || lower == "1x2-x" || has("draw") {
                ResultPick::Draw
            } else if lower == "2" || lower == "1x2-2" || has("away") {
                ResultPick::Away
            } else {
                return Err(MarketParseError::MissingSelection(label.to_string()));
            };
            return Ok(Self::MatchResult(pick));
        }

        Err(MarketParseError::Unrecognized(label.to_string()))
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_id())
    }
}

impl From<Market> for String {
    fn from(market: Market) -> Self {
        market.canonical_id()
    }
}

impl TryFrom<String> for Market {
    type Error = MarketParseError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::from_canonical(&id).ok_or(MarketParseError::Unrecognized(id))
    }
}

/// Goal line of a canonical over/under id. Lines are never negative.
fn canonical_line(text: &str) -> Option<Decimal> {
    let line = Decimal::from_str(text).ok()?;
    (!line.is_sign_negative()).then_some(line)
}

/// First decimal number in `text`: digits, optionally followed by a dot
/// and more digits. A trailing dot with no digits is ignored.
fn extract_line(text: &str) -> Option<Decimal> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];

    let int_len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let mut end = int_len;

    if rest[int_len..].starts_with('.') {
        let frac = &rest[int_len + 1..];
        let frac_len = frac
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(frac.len());
        if frac_len > 0 {
            end = int_len + 1 + frac_len;
        }
    }

    Decimal::from_str(&rest[..end]).ok()
}
