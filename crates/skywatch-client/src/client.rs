//! Async HTTP client wrapping the Skywatch JSON API.

use std::{future::Future, time::Duration};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use skywatch_core::{
  freshness::RegionStatus,
  ingest::{RegionState, ScanOutcome},
  observation::RegionScan,
  report::{Ack, NewReport},
};
use tracing::warn;

use crate::error::{Error, Result};

/// Connection settings for the Skywatch API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url:    String,
  /// Extra attempts after a 503 or a connection failure.
  pub max_retries: u32,
  /// Delay before the first retry; doubled on every further attempt.
  pub retry_delay: Duration,
}

impl ApiConfig {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), max_retries: 3, retry_delay: Duration::from_millis(500) }
  }
}

/// Anything observations can be submitted to.
pub trait Submitter: Sync {
  fn submit_scan<'a>(
    &'a self,
    scan: &'a RegionScan,
  ) -> impl Future<Output = Result<ScanOutcome>> + Send + 'a;

  fn submit_report<'a>(
    &'a self,
    report: &'a NewReport,
  ) -> impl Future<Output = Result<Ack>> + Send + 'a;
}

/// Async HTTP client for the Skywatch JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Send the request built by `build`, retrying while the server reports
  /// itself unavailable or cannot be reached.
  async fn execute<R, F>(&self, what: &str, build: F) -> Result<R>
  where
    R: DeserializeOwned,
    F: Fn() -> RequestBuilder + Send,
  {
    let mut attempt = 0;
    loop {
      let retry = attempt < self.config.max_retries;
      let delay = self.config.retry_delay.saturating_mul(1 << attempt.min(16));
      match build().send().await {
        Ok(resp) if resp.status() == StatusCode::SERVICE_UNAVAILABLE && retry => {
          warn!(%what, attempt, "server unavailable, retrying");
        }
        Ok(resp) if resp.status().is_success() => return Ok(resp.json().await?),
        Ok(resp) => {
          let status = resp.status();
          let body = resp.text().await.unwrap_or_default();
          return Err(Error::Status { what: what.to_owned(), status, body });
        }
        Err(e) if (e.is_connect() || e.is_timeout()) && retry => {
          warn!(%what, attempt, error = %e, "request failed, retrying");
        }
        Err(e) => return Err(e.into()),
      }
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }

  // ── Ingestion ─────────────────────────────────────────────────────────────

  /// `POST /api/scans`
  pub async fn submit_scan(&self, scan: &RegionScan) -> Result<ScanOutcome> {
    self
      .execute("POST /scans", || self.client.post(self.url("/scans")).json(scan))
      .await
  }

  /// `POST /api/reports`
  pub async fn submit_report(&self, report: &NewReport) -> Result<Ack> {
    self
      .execute("POST /reports", || self.client.post(self.url("/reports")).json(report))
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// `GET /api/regions/<galaxy>/<system>`
  pub async fn region_state(&self, galaxy: u16, system: u16) -> Result<RegionState> {
    let path = format!("/regions/{galaxy}/{system}");
    self.execute(&format!("GET {path}"), || self.client.get(self.url(&path))).await
  }

  /// `GET /api/freshness[?galaxy=<g>]`
  pub async fn freshness(&self, galaxy: Option<u16>) -> Result<Vec<RegionStatus>> {
    self
      .execute("GET /freshness", || {
        let req = self.client.get(self.url("/freshness"));
        match galaxy {
          Some(g) => req.query(&[("galaxy", g)]),
          None => req,
        }
      })
      .await
  }
}

impl Submitter for ApiClient {
  fn submit_scan<'a>(
    &'a self,
    scan: &'a RegionScan,
  ) -> impl Future<Output = Result<ScanOutcome>> + Send + 'a {
    ApiClient::submit_scan(self, scan)
  }

  fn submit_report<'a>(
    &'a self,
    report: &'a NewReport,
  ) -> impl Future<Output = Result<Ack>> + Send + 'a {
    ApiClient::submit_report(self, report)
  }
}
