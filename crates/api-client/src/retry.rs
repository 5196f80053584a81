use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Configuration for retry behaviour on POST requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Pause before each retry; the number of entries is the retry count.
    pub delays: Vec<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

impl RetryConfig {
    /// Never retry.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }
}

/// Gateway statuses returned before the upstream handled the request.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 502..=504)
}

/// Retry an HTTP POST with backoff.
///
/// Only failures that happen before the server could have acted on the body
/// are retried: connection errors and 502/503/504. A timeout or a 500 may
/// follow a committed insert, so those are returned as-is.
pub async fn retry_post(
    client: &reqwest::Client,
    url: &str,
    auth_token: Option<&str>,
    body: &serde_json::Value,
    config: &RetryConfig,
) -> Result<reqwest::Response> {
    let max_attempts = config.delays.len() + 1;
    let mut attempt = 0;

    loop {
        let mut req = client.post(url).json(body);
        if let Some(token) = auth_token {
            req = req.bearer_auth(token);
        }
        let outcome = req.send().await;
        let delay = config.delays.get(attempt).copied();

        match (outcome, delay) {
            (Ok(resp), Some(delay)) if is_retryable_status(resp.status()) => {
                warn!(
                    "POST {url} attempt {}/{max_attempts} failed (HTTP {}), retrying in {delay:?}",
                    attempt + 1,
                    resp.status(),
                );
                tokio::time::sleep(delay).await;
            }
            (Err(e), Some(delay)) if e.is_connect() => {
                warn!(
                    "POST {url} attempt {}/{max_attempts} could not connect ({e}), retrying in {delay:?}",
                    attempt + 1,
                );
                tokio::time::sleep(delay).await;
            }
            (outcome, _) => return Ok(outcome?),
        }
        attempt += 1;
    }
}
