//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MatchFeed`: Live match snapshots from the scores feed
//! - `BetStore`: Bets, balances and the transaction ledger

pub mod bet_store;
pub mod match_feed;
