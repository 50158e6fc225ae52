//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Feed endpoints,
//! polling cadence, betting limits and storage paths are externalized
//! here - nothing is hardcoded in the domain layer.

pub mod loader;

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::bet::BettingLimits;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the settlement loop starts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Live match feed endpoint and client tuning.
  #[serde(default)]
  pub feed: FeedConfig,
  /// Polling cadence and concurrency.
  #[serde(default)]
  pub settlement: SettlementConfig,
  /// Stake and odds limits.
  #[serde(default)]
  pub betting: BettingConfig,
  /// Persistence configuration.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Metrics and monitoring.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

/// Match feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  /// Base URL; snapshots are fetched from `{base_url}/matches/{id}`.
  #[serde(default = "default_feed_url")]
  pub base_url: String,
  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Retries after the first attempt.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Base delay for exponential backoff (milliseconds).
  #[serde(default = "default_retry_delay_ms")]
  pub retry_base_delay_ms: u64,
  /// Client-side request budget.
  #[serde(default = "default_requests_per_second")]
  pub requests_per_second: u32,
}

impl FeedConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }

  pub fn retry_base_delay(&self) -> Duration {
    Duration::from_millis(self.retry_base_delay_ms)
  }
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      base_url: default_feed_url(),
      timeout_ms: default_timeout_ms(),
      max_retries: default_max_retries(),
      retry_base_delay_ms: default_retry_delay_ms(),
      requests_per_second: default_requests_per_second(),
    }
  }
}

/// Settlement polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
  /// How often each open bet is re-evaluated (seconds).
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs: u64,
  /// Hard floor between two polls of the same bet (seconds).
  #[serde(default = "default_min_poll_gap")]
  pub min_poll_gap_secs: u64,
  /// Scheduler tick (seconds).
  #[serde(default = "default_tick")]
  pub tick_interval_secs: u64,
  /// Bets evaluated concurrently per tick.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent_bets: usize,
}

impl SettlementConfig {
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_secs)
  }

  pub fn min_poll_gap(&self) -> Duration {
    Duration::from_secs(self.min_poll_gap_secs)
  }

  pub fn tick_interval(&self) -> Duration {
    Duration::from_secs(self.tick_interval_secs)
  }
}

impl Default for SettlementConfig {
  fn default() -> Self {
    Self {
      poll_interval_secs: default_poll_interval(),
      min_poll_gap_secs: default_min_poll_gap(),
      tick_interval_secs: default_tick(),
      max_concurrent_bets: default_max_concurrent(),
    }
  }
}

/// Betting limits configuration. Read by `BetPlacement` callers; the
/// settlement loop does not use it.
#[derive(Debug, Clone, Deserialize)]
pub struct BettingConfig {
  #[serde(default = "default_min_stake")]
  pub min_stake: Decimal,
  #[serde(default = "default_max_stake")]
  pub max_stake: Decimal,
  #[serde(default = "default_max_total_odds")]
  pub max_total_odds: Decimal,
}

impl BettingConfig {
  /// Limits in domain form.
  pub fn limits(&self) -> BettingLimits {
    BettingLimits {
      min_stake: self.min_stake,
      max_stake: self.max_stake,
      max_total_odds: self.max_total_odds,
    }
  }
}

impl Default for BettingConfig {
  fn default() -> Self {
    Self {
      min_stake: default_min_stake(),
      max_stake: default_max_stake(),
      max_total_odds: default_max_total_odds(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for the ledger snapshot and transaction logs.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "sportsbook-settler".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_feed_url() -> String {
  "https://betmaster.com/api/feed/sr".to_string()
}

fn default_timeout_ms() -> u64 {
  10_000
}

fn default_max_retries() -> u32 {
  3
}

fn default_retry_delay_ms() -> u64 {
  1_000
}

fn default_requests_per_second() -> u32 {
  5
}

fn default_poll_interval() -> u64 {
  60
}

fn default_min_poll_gap() -> u64 {
  2
}

fn default_tick() -> u64 {
  5
}

fn default_max_concurrent() -> usize {
  8
}

fn default_min_stake() -> Decimal {
  dec!(1)
}

fn default_max_stake() -> Decimal {
  dec!(10000000)
}

fn default_max_total_odds() -> Decimal {
  dec!(1000)
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_true() -> bool {
  true
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}
