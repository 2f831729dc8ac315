use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        StatusCode,
        header::{REFERER, USER_AGENT},
    },
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::{AppState, error::RelayError, send_upstream};

/// media hosts tend to turn away anything that does not look like a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    url: Option<String>,
}

/// scheme, host and non-default port of `target`, as sent in `Referer`.
///
/// # Errors
///
/// if `target` is not an absolute url
pub fn origin_of(target: &str) -> Result<(Url, String), RelayError> {
    let url = Url::parse(target)?;
    let origin = url.origin().ascii_serialization();
    Ok((url, origin))
}

#[instrument(skip_all)]
pub async fn proxy_video(State(state): State<AppState>, Query(params): Query<ProxyParams>) -> Response {
    let Some(target) = params.url.filter(|url| !url.is_empty()) else {
        tracing::debug!("no url given");
        return (StatusCode::BAD_REQUEST, RelayError::MissingParameter("URL").to_string()).into_response();
    };

    match relay(&state, &target).await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!("proxy error: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error proxying the request").into_response()
        }
    }
}

/// fetch `target` with browser-like headers and mirror the answer.
///
/// nothing is written to the caller until the upstream headers are in, so any
/// error returned here can still become a proper error response.
async fn relay(state: &AppState, target: &str) -> Result<Response, RelayError> {
    let (url, origin) = origin_of(target)?;

    tracing::info!(%origin, "proxying video");

    let request = state
        .client
        .get(url)
        .header(USER_AGENT, BROWSER_USER_AGENT)
        .header(REFERER, origin);
    // only the wait for headers is bounded; the body may stream for as long as it needs
    let resp = tokio::time::timeout(state.upstream_timeout, send_upstream(request))
        .await
        .map_err(|_| RelayError::UpstreamTimeout(state.upstream_timeout))??;

    let status = resp.status();
    if !status.is_success() {
        return Err(RelayError::from_status(status, Value::Null));
    }

    let headers = resp.headers().clone();

    // the body is pulled from upstream only as fast as the caller reads it, and
    // dropping it (caller gone) drops the upstream connection with it.
    let body = Body::from_stream(resp.bytes_stream().map_err(|err| {
        let err = RelayError::StreamInterruption(err);
        tracing::warn!("{err}");
        err
    }));

    tracing::info!("streaming response {status}");

    Ok((status, headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn origin_drops_path_and_query() {
        let (_, origin) = origin_of("https://example.com/video.mp4?token=abc").unwrap();
        assert_eq!(origin, "https://example.com");
    }

    #[test]
    fn origin_keeps_non_default_port() {
        let (_, origin) = origin_of("http://cdn.example.com:8080/a/b.m3u8").unwrap();
        assert_eq!(origin, "http://cdn.example.com:8080");

        let (_, origin) = origin_of("https://cdn.example.com:443/a.ts").unwrap();
        assert_eq!(origin, "https://cdn.example.com");
    }

    #[test]
    fn relative_url_is_invalid() {
        assert!(matches!(
            origin_of("/video.mp4"),
            Err(RelayError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn invalid_url_fails_before_any_request() {
        let state = AppState::new(
            reqwest::Client::new(),
            crate::upstream::Upstream::new(Url::parse("http://127.0.0.1:1").unwrap()),
        );
        let err = relay(&state, "not a url").await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidUrl(_)));
        assert!(!logs_contain("proxying video"));
    }
}
