//! API error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gmscan_core::{CoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    #[error("{0}")]
    NotFound(String),

    /// Public message only; the cause is logged where the error is built
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn report_not_found() -> Self {
        ApiError::NotFound("Report not found".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request("Invalid scan data", err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(err) => err.into(),
            CoreError::Serialization(err) => {
                error!(error = %err, "Serialization failed");
                ApiError::Internal("Failed to create report".to_string())
            }
            CoreError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                ApiError::Internal("Failed to create report".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest { message, details } => ErrorBody { message, details },
            ApiError::NotFound(message) | ApiError::Internal(message) => ErrorBody {
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err: ApiError = CoreError::from(ValidationError::new("serverIp", "is required")).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        match err {
            ApiError::BadRequest { message, details } => {
                assert_eq!(message, "Invalid scan data");
                assert_eq!(details.as_deref(), Some("serverIp: is required"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_internal_hides_cause() {
        let err: ApiError = CoreError::Internal("id space exhausted".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to create report");
    }
}
