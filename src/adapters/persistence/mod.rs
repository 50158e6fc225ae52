//! Persistence Adapters - File-based Bet Ledger
//!
//! Implements the `BetStore` port with an atomic JSON ledger for balances
//! and bets plus append-only JSONL files for wallet transactions.
//! No database dependency; lightweight and crash-recoverable.

pub mod ledger;
pub mod store;
pub mod transactions;

pub use ledger::{Ledger, LedgerFile};
pub use store::FileBetStore;
pub use transactions::TransactionLog;
