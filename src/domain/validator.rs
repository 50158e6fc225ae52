//! Per-market settlement rules.
//!
//! Every function here is pure: a market, a scoreline and whether the match
//! has ended go in, a `SelectionOutcome` comes out. Markets whose winning
//! condition is monotone in the cumulative goal count (Over, BTTS Yes, and
//! the losing side of Under and BTTS No) settle as soon as the threshold is
//! crossed. Everything else waits for the final whistle.

use rust_decimal::Decimal;

use super::market::{DoubleChancePick, Market, MarketParseError, ResultPick, TotalSide};
use super::outcome::SelectionOutcome;
use super::snapshot::{MatchSnapshot, Score};

/// Outcome of validating a raw market label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelValidation {
    /// The verdict; always pending when `diagnostic` is set.
    pub outcome: SelectionOutcome,
    /// Why the label could not be settled, for operators to act on.
    pub diagnostic: Option<MarketParseError>,
}

/// Whether `market` can ever be decided before full time.
pub fn can_decide_early(market: &Market) -> bool {
    matches!(
        market,
        Market::TotalGoals { .. } | Market::BothTeamsToScore { .. }
    )
}

/// Settle a resolved market against a snapshot.
///
/// `fallback` supplies goals when the feed omits them (e.g. the score the
/// caller last displayed); missing values default to zero.
pub fn validate(
    market: &Market,
    snapshot: &MatchSnapshot,
    fallback: Option<Score>,
) -> SelectionOutcome {
    let score = snapshot.score(fallback);
    let ended = snapshot.is_ended();

    match *market {
        Market::MatchResult(pick) => validate_match_result(pick, score, ended),
        Market::DoubleChance(pick) => validate_double_chance(pick, score, ended),
        Market::TotalGoals { side, line } => validate_total_goals(side, line, score, ended),
        Market::BothTeamsToScore { yes } => validate_btts(yes, score, ended),
    }
}

/// Settle a free-text market label. Labels that cannot be resolved stay
/// pending and carry a diagnostic.
pub fn validate_label(
    label: &str,
    snapshot: &MatchSnapshot,
    fallback: Option<Score>,
) -> LabelValidation {
    match Market::resolve(label) {
        Ok(market) => LabelValidation {
            outcome: validate(&market, snapshot, fallback),
            diagnostic: None,
        },
        Err(e) => LabelValidation {
            outcome: SelectionOutcome::pending_with(e.to_string()),
            diagnostic: Some(e),
        },
    }
}

/// 1X2: decidable only at full time.
pub fn validate_match_result(pick: ResultPick, score: Score, ended: bool) -> SelectionOutcome {
    if !ended {
        return SelectionOutcome::pending();
    }

    let won = match pick {
        ResultPick::Home => score.home > score.away,
        ResultPick::Draw => score.home == score.away,
        ResultPick::Away => score.away > score.home,
    };
    final_score_verdict(won, score)
}

/// Double chance: decidable only at full time.
pub fn validate_double_chance(
    pick: DoubleChancePick,
    score: Score,
    ended: bool,
) -> SelectionOutcome {
    if !ended {
        return SelectionOutcome::pending();
    }

    let won = match pick {
        DoubleChancePick::HomeOrDraw => score.home >= score.away,
        DoubleChancePick::DrawOrAway => score.away >= score.home,
        DoubleChancePick::HomeOrAway => score.home != score.away,
    };
    final_score_verdict(won, score)
}

/// Over/Under a goal line.
///
/// Over wins early once the line is exceeded; Under loses early at the same
/// moment. Otherwise both wait for full time, where a total equal to the
/// line loses for both sides.
pub fn validate_total_goals(
    side: TotalSide,
    line: Decimal,
    score: Score,
    ended: bool,
) -> SelectionOutcome {
    let total = score.total();
    let exceeded = Decimal::from(total) > line;

    match side {
        TotalSide::Over => {
            if exceeded {
                SelectionOutcome::won(format!("Total goals: {total} > {line}"))
            } else if ended {
                SelectionOutcome::lost(format!("Final total: {total} <= {line}"))
            } else {
                SelectionOutcome::pending()
            }
        }
        TotalSide::Under => {
            if ended {
                if Decimal::from(total) < line {
                    SelectionOutcome::won(format!("Final total: {total} < {line}"))
                } else {
                    SelectionOutcome::lost(format!("Final total: {total} >= {line}"))
                }
            } else if exceeded {
                SelectionOutcome::lost(format!("Total goals: {total} > {line}"))
            } else {
                SelectionOutcome::pending()
            }
        }
    }
}

/// Both teams to score.
///
/// Once both sides have scored, Yes is won and No is lost regardless of
/// the clock. Otherwise the market waits for full time.
pub fn validate_btts(yes: bool, score: Score, ended: bool) -> SelectionOutcome {
    let both = score.both_scored();

    match (yes, both, ended) {
        (true, true, _) => SelectionOutcome::won("Both teams scored"),
        (false, true, _) => SelectionOutcome::lost("Both teams scored"),
        (true, false, true) => SelectionOutcome::lost("At least one team didn't score"),
        (false, false, true) => SelectionOutcome::won("At least one team didn't score"),
        (_, false, false) => SelectionOutcome::pending(),
    }
}

fn final_score_verdict(won: bool, score: Score) -> SelectionOutcome {
    let reason = format!("Final score: {score}");
    if won {
        SelectionOutcome::won(reason)
    } else {
        SelectionOutcome::lost(reason)
    }
}
