//! Match Feed HTTP Client - Rate-limited Snapshot Fetcher
//!
//! Implements the `MatchFeed` port over the scores feed's REST API.
//! Wraps reqwest with a client-side rate limiter and bounded retries
//! with exponential backoff.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::types::parse_match_details;
use crate::config::FeedConfig;
use crate::domain::bet::MatchId;
use crate::domain::snapshot::MatchSnapshot;
use crate::ports::match_feed::MatchFeed;

/// Rate-limited HTTP client for match snapshots.
pub struct HttpMatchFeed {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: FeedConfig,
  /// Request budget shared by all pollers.
  limiter: DefaultDirectRateLimiter,
  /// Outcome of the most recent request.
  last_ok: AtomicBool,
}

impl HttpMatchFeed {
  /// Create a new feed client.
  pub fn new(config: FeedConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout())
      .pool_max_idle_per_host(5)
      .user_agent(concat!("sportsbook-settler/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;

    let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_second(rps));

    Ok(Self {
      http,
      config,
      limiter,
      last_ok: AtomicBool::new(true),
    })
  }

  /// URL of a match document.
  pub fn match_url(&self, match_id: MatchId) -> String {
    format!(
      "{}/matches/{}",
      self.config.base_url.trim_end_matches('/'),
      match_id
    )
  }

  /// GET with rate limiting and retries. Returns the body on 200.
  async fn get_with_retry(&self, url: &str) -> Result<String> {
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self
          .config
          .retry_base_delay()
          .saturating_mul(2u32.saturating_pow(attempt - 1));
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        debug!(attempt, delay_ms, "Retrying feed request");
        sleep(delay).await;
      }

      self.limiter.until_ready().await;

      let response = match self
        .http
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
      {
        Ok(response) => response,
        Err(e) => {
          warn!(error = %e, attempt, "Feed request failed");
          last_error = Some(anyhow::Error::from(e));
          continue;
        }
      };

      match response.status() {
        StatusCode::OK => {
          return response.text().await.context("Failed to read feed response body");
        }
        // The feed answers transient overload with 400 as well as 429/5xx.
        status
          if status == StatusCode::BAD_REQUEST
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error() =>
        {
          warn!(status = %status, attempt, "Feed returned retryable status");
          last_error = Some(anyhow::anyhow!("Feed returned {status}"));
        }
        status => {
          let body = response.text().await.unwrap_or_default();
          return Err(anyhow::anyhow!("Feed error {status}: {body}"));
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }
}

#[async_trait]
impl MatchFeed for HttpMatchFeed {
  #[instrument(skip(self))]
  async fn snapshot(&self, match_id: MatchId) -> Result<MatchSnapshot> {
    let url = self.match_url(match_id);

    let result = async {
      let body = self.get_with_retry(&url).await?;
      parse_match_details(&body)
    }
    .await
    .with_context(|| format!("Failed to fetch snapshot for match {match_id}"));

    self.last_ok.store(result.is_ok(), Ordering::Relaxed);

    if let Ok(snap) = &result {
      debug!(
        match_id,
        home = ?snap.home_goals,
        away = ?snap.away_goals,
        lifecycle = ?snap.lifecycle,
        "Snapshot received"
      );
    }

    result
  }

  async fn is_healthy(&self) -> bool {
    self.last_ok.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_match_url_trims_trailing_slash() {
    let feed = HttpMatchFeed::new(FeedConfig {
      base_url: "http://feed.local/api/".to_string(),
      ..FeedConfig::default()
    })
    .unwrap();
    assert_eq!(feed.match_url(42), "http://feed.local/api/matches/42");
  }

  #[tokio::test]
  async fn test_unreachable_feed_reports_unhealthy() {
    let feed = HttpMatchFeed::new(FeedConfig {
      base_url: "http://127.0.0.1:9".to_string(),
      timeout_ms: 200,
      max_retries: 0,
      ..FeedConfig::default()
    })
    .unwrap();

    assert!(feed.is_healthy().await);
    assert!(feed.snapshot(1).await.is_err());
    assert!(!feed.is_healthy().await);
  }
}
