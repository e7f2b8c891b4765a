//! # HTTP Plumbing
//!
//! Shared pieces of the generation and store clients: endpoint joining, status
//! checks, and the per-attempt timeout + exponential backoff retry loop.
//!
//! ## Retry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        One Logical Request                              │
//! │                                                                         │
//! │  ┌──────────┐  ok   ┌──────────┐                                        │
//! │  │ Attempt  │ ────► │  Done    │                                        │
//! │  │ (timeout)│       └──────────┘                                        │
//! │  └────┬─────┘                                                           │
//! │       │ error                                                           │
//! │       ▼                                                                 │
//! │  retryable && attempts left? ── no ──► return the error                │
//! │       │ yes                                                             │
//! │       ▼                                                                 │
//! │  ┌──────────┐  sleep(next_backoff)                                      │
//! │  │ Backoff  │ ─────────────────────► Attempt                           │
//! │  └──────────┘                                                           │
//! │                                                                         │
//! │  BACKOFF STRATEGY (Exponential with Jitter)                            │
//! │  Attempt 1: 500ms   Attempt 2: 1s   Attempt 3: 2s   ...   Max: 10s     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::error::{GatewayError, GatewayResult};

/// Error bodies longer than this are cut before they land in an error.
const MAX_ERROR_BODY: usize = 512;

// =============================================================================
// Retry Policy
// =============================================================================

/// Timeout and retry settings for one kind of request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for a single attempt.
    pub attempt_timeout: Duration,

    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,

    /// First backoff delay.
    pub initial_backoff: Duration,

    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempt_timeout: Duration::from_secs(120),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A single attempt with the given deadline.
    pub fn single_attempt(attempt_timeout: Duration) -> Self {
        RetryPolicy {
            attempt_timeout,
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Runs `attempt` until it succeeds, fails permanently or runs out of
    /// retries. Each attempt is bounded by `attempt_timeout`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut retries = 0u32;

        loop {
            let result = match timeout(self.attempt_timeout, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout(self.attempt_timeout.as_secs())),
            };

            let error = match result {
                Ok(value) => {
                    if retries > 0 {
                        debug!(operation, retries, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || retries >= self.max_retries {
                return Err(error);
            }

            let Some(delay) = backoff.next_backoff() else {
                return Err(error);
            };
            retries += 1;
            warn!(
                operation,
                attempt = retries,
                ?delay,
                error = %error,
                "Transient failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None, // Bounded by max_retries instead
            ..Default::default()
        }
    }
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Joins `path` onto a service base URL, keeping any base path prefix.
///
/// `http://host/api` + `generate` → `http://host/api/generate`
pub(crate) fn endpoint(base_url: &str, path: &str) -> GatewayResult<Url> {
    let mut base = Url::parse(base_url)?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(GatewayError::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {base_url}"
        )));
    }
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path)?)
}

/// Builds the shared HTTP client.
pub(crate) fn client(connect_timeout: Duration) -> GatewayResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("atelier-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::InvalidConfig(format!("HTTP client: {e}")))
}

/// Turns a non-success response into [`GatewayError::HttpStatus`].
pub(crate) async fn error_for_status(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        body.truncate(cut);
    }

    Err(GatewayError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}
