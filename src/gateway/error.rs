//! Gateway error types and their HTTP mapping

use super::models::Status;
use crate::source::SourceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The external source rejected or could not execute the read.
    /// Carries the upstream message verbatim.
    #[error("{0}")]
    UpstreamQueryFailed(String),

    /// The request was malformed or out of range
    #[error("{0}")]
    ValidationFailed(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamQueryFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<SourceError> for GatewayError {
    fn from(err: SourceError) -> Self {
        GatewayError::UpstreamQueryFailed(err.to_string())
    }
}

/// Error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: Status,
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            status: Status::Error,
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_failure_status() {
        let err = GatewayError::UpstreamQueryFailed("boom".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_validation_status() {
        let err = GatewayError::ValidationFailed("n_results must be greater than 0".to_string());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_source_error_message_kept_verbatim() {
        let err: GatewayError = SourceError::Rejected {
            status: 401,
            code: None,
            message: "Invalid API key".to_string(),
        }
        .into();
        assert!(matches!(err, GatewayError::UpstreamQueryFailed(ref m) if m == "Invalid API key"));
    }

    #[test]
    fn test_into_response_status() {
        let response = GatewayError::UpstreamQueryFailed("down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
