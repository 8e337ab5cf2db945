use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{PublisherError, SynthesisError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures surfaced at the HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body is not a valid event or snapshot
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Management backend failed; the caller is expected to retry
    #[error(transparent)]
    Publisher(#[from] PublisherError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: message }),
            )
                .into_response(),
            ApiError::Synthesis(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response(),
            // Body is the bare error text as a JSON string
            ApiError::Publisher(e) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(e.to_string())).into_response()
            }
        }
    }
}
