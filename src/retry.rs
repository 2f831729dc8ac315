use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::{error::RelayError, fetch_json};

/// how often to ask a flaky upstream, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// the trending list is regenerated upstream and is often briefly unavailable.
    pub const TRENDING: Self = Self {
        max_attempts: 20,
        delay: Duration::from_millis(500),
    };

    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// GET `url` until it answers with json, sleeping `policy.delay` between attempts.
///
/// each attempt is bounded by `timeout`; an attempt that runs out of time is
/// retried like any other failure without a status.
///
/// attempts run strictly one after another. a 4xx answer stops the loop at
/// once, even on the last attempt; anything else is retried until
/// `policy.max_attempts` calls have been made.
///
/// # Errors
///
/// - [`RelayError::UpstreamClientError`] as soon as the upstream rejects the request
/// - [`RelayError::RetriesExhausted`] wrapping the last failure otherwise
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_json_with_retry(
    client: &Client,
    url: &Url,
    timeout: Duration,
    policy: RetryPolicy,
) -> Result<Value, RelayError> {
    let attempts = policy.max_attempts.max(1);

    let mut attempt = 0;
    loop {
        let err = match fetch_json(client, url.clone(), timeout).await {
            Ok(payload) => return Ok(payload),
            Err(err) => err,
        };

        attempt += 1;

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt == attempts {
            return Err(RelayError::RetriesExhausted {
                attempts,
                last: Box::new(err),
            });
        }

        tracing::debug!(attempt, max_attempts = attempts, "retrying after error: {err}");
        tokio::time::sleep(policy.delay).await;
    }
}
