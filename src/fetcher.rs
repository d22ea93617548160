//! Product snapshot fetching
//!
//! Precedence:
//! 1. Live HTTP endpoint, retried with exponential backoff + jitter
//! 2. Local payload file
//! 3. Built-in sample payload
//!
//! [`Fetcher::fetch`] always yields a snapshot; the source it came from is
//! reported alongside it.

use crate::error::{Result, StockError};
use rand::Rng;
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base delay between retries. Actual delay = base * 2^attempt + jitter.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(750);
/// Upper bound of the uniform random jitter added to each backoff.
pub const DEFAULT_JITTER_CAP: Duration = Duration::from_millis(300);

const USER_AGENT: &str = "stock_watch/1.0";

/// Retry behavior for the live endpoint
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first failure
    pub max_retries: u32,
    pub base_delay: Duration,
    pub jitter_cap: Duration,
    /// Per-attempt request timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: DEFAULT_BACKOFF_BASE,
            jitter_cap: DEFAULT_JITTER_CAP,
            timeout: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Backoff without jitter for a 0-indexed attempt
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|multiplier| self.base_delay.checked_mul(multiplier))
            .unwrap_or(Duration::MAX)
    }

    /// Backoff plus uniform jitter in `[0, jitter_cap]`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for_attempt(attempt);
        let cap_ms = u64::try_from(self.jitter_cap.as_millis()).unwrap_or(u64::MAX);
        if cap_ms == 0 {
            return base;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=cap_ms);
        base.saturating_add(Duration::from_millis(jitter_ms))
    }
}

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Remote,
    LocalFile,
    Sample,
}

impl fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotSource::Remote => write!(f, "remote"),
            SnapshotSource::LocalFile => write!(f, "local file"),
            SnapshotSource::Sample => write!(f, "sample"),
        }
    }
}

/// One point-in-time inventory response
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub payload: Value,
    pub source: SnapshotSource,
}

/// Minimal payload used when nothing else is available
pub fn sample_payload() -> Value {
    json!({
        "data": [
            {
                "_id": "6636020d5c0420e92d79ebdd",
                "name": "Amul High Protein Paneer, 400 g | Pack of 2",
                "available": 1,
                "inventory_quantity": 1079
            }
        ]
    })
}

/// Snapshot source chain
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    endpoint: Option<String>,
    payload_file: Option<PathBuf>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(
        endpoint: Option<String>,
        payload_file: Option<PathBuf>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
            payload_file,
            policy,
        }
    }

    /// Fetch the latest snapshot, falling back through file and sample.
    pub async fn fetch(&self) -> Snapshot {
        if let Some(endpoint) = &self.endpoint {
            match self.fetch_remote(endpoint).await {
                Ok(payload) => {
                    return Snapshot {
                        payload,
                        source: SnapshotSource::Remote,
                    }
                }
                Err(e) => log::error!("All fetch attempts failed; falling back: {}", e),
            }
        }

        if let Some(path) = &self.payload_file {
            match load_file(path) {
                Ok(payload) => {
                    log::debug!("Loaded payload from {}", path.display());
                    return Snapshot {
                        payload,
                        source: SnapshotSource::LocalFile,
                    };
                }
                Err(e) => log::error!("Failed to read payload file {}: {}", path.display(), e),
            }
        }

        log::debug!("Using built-in sample payload");
        Snapshot {
            payload: sample_payload(),
            source: SnapshotSource::Sample,
        }
    }

    /// Fetch from the live endpoint, retrying up to `max_retries` extra times.
    /// Returns the last attempt's error once all attempts are spent.
    pub async fn fetch_remote(&self, endpoint: &str) -> Result<Value> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(endpoint).await {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    log::warn!("Fetch attempt {} failed: {}", attempt + 1, e);
                    if attempt >= self.policy.max_retries {
                        return Err(e);
                    }
                    let delay = self.policy.delay_for_attempt(attempt);
                    log::debug!("Retrying fetch in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_once(&self, endpoint: &str) -> Result<Value> {
        let response = self
            .client
            .get(endpoint)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .timeout(self.policy.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StockError::HttpStatus(response.status()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Read a JSON snapshot from disk
pub fn load_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
