//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    feed = %config.feed.base_url,
    poll_interval_secs = config.settlement.poll_interval_secs,
    data_dir = %config.persistence.data_dir,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Non-empty feed URL and sane client tuning
/// - Poll interval not shorter than the minimum gap
/// - Coherent stake and odds limits
fn validate_config(config: &AppConfig) -> Result<()> {
  // Feed validation
  anyhow::ensure!(
    !config.feed.base_url.is_empty(),
    "Feed base_url must not be empty"
  );
  anyhow::ensure!(
    config.feed.timeout_ms > 0,
    "Feed timeout_ms must be positive"
  );
  anyhow::ensure!(
    config.feed.requests_per_second > 0,
    "Feed requests_per_second must be positive"
  );

  // Settlement validation
  anyhow::ensure!(
    config.settlement.min_poll_gap_secs > 0,
    "min_poll_gap_secs must be positive"
  );
  anyhow::ensure!(
    config.settlement.poll_interval_secs >= config.settlement.min_poll_gap_secs,
    "poll_interval_secs ({}) must be >= min_poll_gap_secs ({})",
    config.settlement.poll_interval_secs,
    config.settlement.min_poll_gap_secs
  );
  anyhow::ensure!(
    config.settlement.tick_interval_secs > 0,
    "tick_interval_secs must be positive"
  );
  anyhow::ensure!(
    config.settlement.max_concurrent_bets > 0,
    "max_concurrent_bets must be positive"
  );

  // Betting validation
  let betting = &config.betting;
  anyhow::ensure!(
    betting.min_stake > Decimal::ZERO,
    "min_stake must be positive, got {}",
    betting.min_stake
  );
  anyhow::ensure!(
    betting.max_stake >= betting.min_stake,
    "max_stake ({}) must be >= min_stake ({})",
    betting.max_stake,
    betting.min_stake
  );
  anyhow::ensure!(
    betting.max_total_odds > Decimal::ONE,
    "max_total_odds must be > 1, got {}",
    betting.max_total_odds
  );

  // Persistence validation
  anyhow::ensure!(
    !config.persistence.data_dir.is_empty(),
    "persistence.data_dir must not be empty"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_shipped_config_is_valid() {
    let config = load_config(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml")).unwrap();
    assert_eq!(config.service.name, "sportsbook-settler");
    assert_eq!(config.betting.limits(), crate::domain::bet::BettingLimits::default());
  }

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.settlement.poll_interval_secs, 60);
    assert_eq!(config.settlement.min_poll_gap_secs, 2);
    assert_eq!(config.betting.max_total_odds, dec!(1000));
    assert_eq!(config.persistence.data_dir, "data");
  }

  #[test]
  fn test_overrides_are_applied() {
    let config = parse_config(
      r#"
      [feed]
      base_url = "http://localhost:8000"
      max_retries = 1

      [settlement]
      poll_interval_secs = 5

      [betting]
      max_stake = "500"
      "#,
    )
    .unwrap();
    assert_eq!(config.feed.base_url, "http://localhost:8000");
    assert_eq!(config.feed.max_retries, 1);
    assert_eq!(config.settlement.poll_interval_secs, 5);
    assert_eq!(config.betting.limits().max_stake, dec!(500));
  }

  #[test]
  fn test_rejects_poll_interval_below_gap() {
    let err = parse_config(
      r#"
      [settlement]
      poll_interval_secs = 1
      min_poll_gap_secs = 2
      "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("poll_interval_secs"));
  }

  #[test]
  fn test_rejects_inverted_stake_bounds() {
    let result = parse_config(
      r#"
      [betting]
      min_stake = 100
      max_stake = 10
      "#,
    );
    assert!(result.is_err());
  }
}
