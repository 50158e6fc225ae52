//! Domain layer - Settlement engine and betting models.
//!
//! Pure logic only: no I/O, no clocks except where a timestamp is passed
//! in, no shared state. Everything here is safe to call concurrently from
//! any number of pollers (hexagonal architecture inner ring).

pub mod bet;
pub mod market;
pub mod outcome;
pub mod snapshot;
pub mod validator;

// Re-export core types for convenience
pub use bet::{
    Bet, BetId, BetSlip, BettingLimits, MatchId, Selection, SlipEntry, SlipError, SlipToggle,
    Transaction, TransactionKind, UserId,
};
pub use market::{DoubleChancePick, Market, MarketParseError, ResultPick, TotalSide};
pub use outcome::{aggregate, BetStatus, SelectionOutcome, SelectionStatus};
pub use snapshot::{LifecycleStatus, MatchSnapshot, Score};
pub use validator::{can_decide_early, validate, validate_label, LabelValidation};
