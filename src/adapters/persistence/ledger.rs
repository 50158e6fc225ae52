//! Ledger File - Atomic JSON Snapshot of Balances and Bets
//!
//! The whole ledger is written to `ledger.json` via tmp file + rename, so
//! the file on disk is always either the previous or the next version.
//! A stake debit and its bet, or a winnings credit and the bet's
//! `winnings_credited` flag, therefore land in the same write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::domain::bet::{Bet, BetId, UserId};

/// In-memory image of `ledger.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Bumped on every successful write.
    pub version: u64,
    /// Wallet balance per user.
    #[serde(default)]
    pub balances: BTreeMap<UserId, Decimal>,
    /// Every bet ever placed, keyed by id.
    #[serde(default)]
    pub bets: BTreeMap<BetId, Bet>,
}

impl Ledger {
    pub fn balance(&self, user_id: &str) -> Decimal {
        self.balances.get(user_id).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Atomic JSON writer for the ledger.
pub struct LedgerFile {
    /// Path to ledger.json.
    path: PathBuf,
    /// Temporary path for atomic writes.
    tmp_path: PathBuf,
}

impl LedgerFile {
    /// Create the data directory if needed.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            path: data_dir.join("ledger.json"),
            tmp_path: data_dir.join("ledger.json.tmp"),
        })
    }

    /// Write the ledger atomically (tmp → rename).
    #[instrument(skip(self, ledger), fields(version = ledger.version))]
    pub async fn save(&self, ledger: &Ledger) -> Result<()> {
        let json = serde_json::to_string_pretty(ledger).context("Failed to serialize ledger")?;

        fs::write(&self.tmp_path, &json)
            .await
            .context("Failed to write tmp ledger file")?;

        fs::rename(&self.tmp_path, &self.path)
            .await
            .context("Failed to rename ledger file")?;

        debug!(path = %self.path.display(), "Ledger saved");
        Ok(())
    }

    /// Load the ledger, or an empty one on first start.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Ledger> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            info!("No ledger file found, starting fresh");
            return Ok(Ledger::default());
        }

        let json = fs::read_to_string(&self.path)
            .await
            .context("Failed to read ledger file")?;

        let ledger: Ledger = serde_json::from_str(&json).context("Failed to parse ledger JSON")?;

        info!(
            version = ledger.version,
            bets = ledger.bets.len(),
            users = ledger.balances.len(),
            "Ledger loaded"
        );

        Ok(ledger)
    }

    /// Check the ledger file is readable when present.
    pub async fn is_healthy(&self) -> bool {
        match fs::try_exists(&self.path).await {
            Ok(true) => fs::metadata(&self.path).await.is_ok(),
            Ok(false) => true,
            Err(_) => false,
        }
    }
}
