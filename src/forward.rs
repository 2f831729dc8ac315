//! json endpoints that pass anime api queries straight through.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::{AppState, error::RelayError, fetch_json, retry::fetch_json_with_retry};

pub const REFRESH_MESSAGE: &str = "Failed to load the page please refresh";

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TitleParams {
    title: Option<String>,
}

impl TitleParams {
    fn title(self) -> Result<String, RelayError> {
        self.title
            .filter(|title| !title.is_empty())
            .ok_or(RelayError::MissingParameter("Title"))
    }
}

pub async fn index() -> &'static str {
    "The service is working fine"
}

#[instrument(skip_all)]
pub async fn latest(State(state): State<AppState>, Query(params): Query<PageParams>) -> Response {
    let page = params.page.filter(|page| !page.is_empty());
    let url = state.upstream.latest(page.as_deref().unwrap_or("1"));

    match fetch_json(&state.client, url, state.upstream_timeout).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => {
            tracing::warn!("failed to fetch latest anime: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

#[instrument(skip_all)]
pub async fn episodes(
    State(state): State<AppState>,
    Query(params): Query<TitleParams>,
) -> Result<Json<Value>, RelayError> {
    let url = state.upstream.episodes(&params.title()?);
    let payload = fetch_json(&state.client, url, state.upstream_timeout)
        .await
        .inspect_err(|err| tracing::warn!("failed to fetch anime episodes: {err}"))?;
    Ok(Json(payload))
}

#[instrument(skip_all)]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<TitleParams>,
) -> Result<Json<Value>, RelayError> {
    let url = state.upstream.search(&params.title()?);
    let payload = fetch_json(&state.client, url, state.upstream_timeout)
        .await
        .inspect_err(|err| tracing::warn!("failed to search anime: {err}"))?;
    Ok(Json(payload))
}

#[instrument(skip_all)]
pub async fn trending(State(state): State<AppState>) -> Response {
    let url = state.upstream.trending();

    let result =
        fetch_json_with_retry(&state.client, &url, state.upstream_timeout, state.trending_retry)
            .await;

    match result {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => {
            tracing::error!("failed to fetch trending anime: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": REFRESH_MESSAGE })),
            )
                .into_response()
        }
    }
}
