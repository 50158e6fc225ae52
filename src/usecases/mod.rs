//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! service's workflows. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `SettlementService`: evaluate and settle open bets
//! - `PollScheduler`: per-bet polling cadence
//! - `SettlementRunner`: tick loop driving the settlement service
//! - `BetPlacement`: validate a slip and place it

pub mod placement;
pub mod poll_scheduler;
pub mod runner;
pub mod settlement;

pub use placement::BetPlacement;
pub use poll_scheduler::{PollScheduler, PollState};
pub use runner::SettlementRunner;
pub use settlement::{BetEvaluation, BetResult, SettlementReport, SettlementService};
