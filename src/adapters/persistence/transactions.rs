//! Transaction Log - Append-only JSONL Wallet Movements
//!
//! Each stake debit and winnings credit is appended to
//! `transactions/YYYY-MM-DD.jsonl`, partitioned by the transaction's own
//! timestamp. The ledger holds the balances; this log is the audit trail.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{instrument, warn};

use crate::domain::bet::Transaction;

/// Append-only JSONL transaction log with daily files.
pub struct TransactionLog {
    dir: PathBuf,
}

impl TransactionLog {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("transactions");
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create transactions directory")?;
        Ok(Self { dir })
    }

    /// Append one record to the file for its day.
    #[instrument(skip(self, tx), fields(tx_id = %tx.id, kind = ?tx.kind))]
    pub async fn append(&self, tx: &Transaction) -> Result<()> {
        let date = tx.timestamp.format("%Y-%m-%d").to_string();
        let path = self.dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(tx).context("Failed to serialize transaction")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open transaction log file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write transaction")?;
        file.flush().await.context("Failed to flush transaction log")?;

        Ok(())
    }

    /// All records for one user across every daily file, oldest first.
    #[instrument(skip(self))]
    pub async fn load_for_user(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "jsonl") {
                continue;
            }

            let content = fs::read_to_string(&path).await?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<Transaction>(line) {
                    Ok(tx) if tx.user_id == user_id => records.push(tx),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Skipping malformed transaction");
                    }
                }
            }
        }

        records.sort_by_key(|t| t.timestamp);
        Ok(records)
    }

    /// Check the directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let probe = self.dir.join(".health_check");
        let result = fs::write(&probe, b"ok").await;
        let _ = fs::remove_file(&probe).await;
        result.is_ok()
    }
}
