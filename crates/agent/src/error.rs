//! HTTP error responses
//!
//! Every error leaves the service as `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use status_lib::AggregationError;
use std::any::Any;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// 500 - the aggregation pass could not list containers
    Aggregation(AggregationError),
    /// 429 - global request ceiling reached
    RateLimited,
    /// 503 - the request did not finish within the request timeout
    Timeout,
    /// 500 - anything else
    Internal(String),
}

impl From<AggregationError> for ApiError {
    fn from(err: AggregationError) -> Self {
        ApiError::Aggregation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Aggregation(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate limit exceeded".to_string(),
            ),
            ApiError::Timeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                "request timed out".to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Aggregation(e) => write!(f, "{}", e),
            ApiError::RateLimited => write!(f, "Rate limit exceeded"),
            ApiError::Timeout => write!(f, "Request timed out"),
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

/// Convenience alias for handler results
pub type ApiResult<T> = Result<T, ApiError>;

/// Turn a caught handler panic into a 500 response
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");
    ApiError::Internal("internal server error".to_string()).into_response()
}
