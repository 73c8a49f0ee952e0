//! API Error Responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use obd_session::SessionError;
use serde_json::json;
use thiserror::Error;

/// Errors returned to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request conflicts with the current session state
    #[error("{0}")]
    Conflict(String),

    /// Server lacks what the request needs
    #[error("{0}")]
    Unavailable(String),

    /// Command task failed
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Configuration(msg) => ApiError::Unavailable(msg),
            other => ApiError::Conflict(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
