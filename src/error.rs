use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

/// everything that can go wrong while serving one request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    #[error("invalid target url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("upstream rejected the request with {status}")]
    UpstreamClientError { status: StatusCode, details: Value },

    #[error("upstream failed with {status}")]
    UpstreamServerError { status: StatusCode, details: Value },

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] reqwest::Error),

    #[error("upstream sent no response within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("upstream stream interrupted: {0}")]
    StreamInterruption(#[source] reqwest::Error),

    #[error("upstream sent an invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<RelayError>,
    },

    #[error("{0}")]
    Http(#[source] reqwest::Error),
}

impl RelayError {
    /// build the error for an upstream response that was not a success.
    pub fn from_status(status: StatusCode, details: Value) -> Self {
        if status.is_server_error() {
            Self::UpstreamServerError { status, details }
        } else {
            Self::UpstreamClientError { status, details }
        }
    }

    /// the status the upstream answered with, if it answered at all.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Self::UpstreamClientError { status, .. } | Self::UpstreamServerError { status, .. } => {
                Some(*status)
            }
            Self::RetriesExhausted { last, .. } => last.upstream_status(),
            _ => None,
        }
    }

    /// a missing status counts as retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.upstream_status(), Some(status) if status.as_u16() < 500)
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::UpstreamUnreachable(err)
        } else {
            Self::Http(err)
        }
    }
}

/// the error envelope used by the json endpoints.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            Self::MissingParameter(_) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::UpstreamClientError { status, details }
            | Self::UpstreamServerError { status, details } => (
                status,
                json!({ "error": "Error from anime API", "details": details }),
            ),
            Self::UpstreamUnreachable(_) | Self::UpstreamTimeout(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Unable to reach anime API service" }),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error", "message": message }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
