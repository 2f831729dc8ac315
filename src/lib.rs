pub mod config;
pub mod error;
pub mod forward;
pub mod relay;
pub mod retry;
pub mod upstream;

use std::time::Duration;

use axum::{Router, http::StatusCode, routing::get};
use reqwest::{Client, IntoUrl};
use serde_json::Value;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use error::RelayError;
use retry::RetryPolicy;
use upstream::Upstream;

/// how long one upstream call may take before it counts as unreachable.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// shared by every handler. cloned per request, never mutated.
#[derive(Debug, Clone)]
pub struct AppState {
    pub client: Client,
    pub upstream: Upstream,
    pub upstream_timeout: Duration,
    pub trending_retry: RetryPolicy,
}

impl AppState {
    pub fn new(client: Client, upstream: Upstream) -> Self {
        Self {
            client,
            upstream,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            trending_retry: RetryPolicy::TRENDING,
        }
    }

    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_trending_retry(mut self, policy: RetryPolicy) -> Self {
        self.trending_retry = policy;
        self
    }

    /// longest a handler can legitimately take: every trending attempt timing
    /// out and every delay slept, plus one spare upstream timeout and a second
    /// of slack.
    pub fn request_deadline(&self) -> Duration {
        let attempts = self.trending_retry.max_attempts.max(1);
        (self.upstream_timeout + self.trending_retry.delay) * attempts
            + self.upstream_timeout
            + Duration::from_secs(1)
    }
}

pub fn app(state: AppState) -> Router {
    let deadline = state.request_deadline();

    Router::new()
        .route("/", get(forward::index))
        .route("/proxy-video", get(relay::proxy_video))
        .route("/api/anime", get(forward::latest))
        .route("/api/episodes", get(forward::episodes))
        .route("/api/anime/search", get(forward::search))
        .route("/api/anime/trending", get(forward::trending))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            deadline,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// send the `request` and get its `Response`, whatever its status.
///
/// # Errors
///
/// if the request could not be sent or no response arrived
pub async fn send_upstream(request: reqwest::RequestBuilder) -> Result<reqwest::Response, RelayError> {
    Ok(request.send().await?)
}

/// one GET against `url`, expecting a json document back within `timeout`.
///
/// # Errors
///
/// - the upstream answered with a non-success status; its body is kept as `details`
/// - the upstream could not be reached or did not finish answering in time
/// - the body could not be read
/// - a successful response did not carry json
pub async fn fetch_json(
    client: &Client,
    url: impl IntoUrl,
    timeout: Duration,
) -> Result<Value, RelayError> {
    let resp = send_upstream(client.get(url).timeout(timeout)).await?;
    let status = resp.status();
    let body = resp.bytes().await?;

    if !status.is_success() {
        let details = serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
        return Err(RelayError::from_status(status, details));
    }

    Ok(serde_json::from_slice(&body)?)
}
