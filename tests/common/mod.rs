//! Shared helpers for driving the router against a mocked upstream.

#![allow(dead_code)]

use std::time::Duration;

use anime_relay::{AppState, app, retry::RetryPolicy, upstream::Upstream};
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use tower::ServiceExt;
use url::Url;
use wiremock::MockServer;

/// state whose json endpoints point at `server`, retrying quickly.
pub fn state_for(server: &MockServer) -> AppState {
    let upstream = Upstream::new(Url::parse(&server.uri()).unwrap());
    AppState::new(reqwest::Client::new(), upstream)
        .with_upstream_timeout(Duration::from_secs(5))
        .with_trending_retry(RetryPolicy::new(3, Duration::from_millis(10)))
}

pub fn router_for(server: &MockServer) -> Router {
    app(state_for(server))
}

pub async fn get(router: Router, uri: &str) -> Response<Body> {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}
