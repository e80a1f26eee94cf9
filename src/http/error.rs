use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Errors reported to HTTP callers.
///
/// The response body only carries the fixed message of the variant; the
/// underlying cause is logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("input must be numeric")]
    InvalidInput,

    #[error("invalid timestamp")]
    InvalidTimestamp(#[source] anyhow::Error),

    #[error("invalid JSON body")]
    MalformedBody(#[from] JsonRejection),

    #[error("database error")]
    Store(#[source] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput | ApiError::InvalidTimestamp(_) | ApiError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(err) => error!("request failed: {err:#}"),
            ApiError::InvalidTimestamp(err) => debug!("rejected timestamp: {err:#}"),
            ApiError::MalformedBody(rejection) => debug!("rejected body: {rejection}"),
            ApiError::InvalidInput => {}
        }

        let body = ErrorBody {
            error: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
