use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::storage::StoreError;

/// Message for every authorization failure; missing, unknown, foreign and
/// expired tokens are indistinguishable to the caller.
pub const FORBIDDEN_MESSAGE: &str = "Missing required token in header, or token is invalid.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,
    #[error("{0}")]
    Consistency(String),
    #[error("{0}")]
    Internal(String),
    #[error("Method not allowed.")]
    MethodNotAllowed,
    #[error("Service unavailable.")]
    Unavailable,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    /// Logs the underlying failure and hides it behind `msg`.
    pub fn store(err: StoreError, msg: &str) -> Self {
        if let StoreError::InvalidKey(key) = &err {
            warn!(key = %key, "unaddressable record key");
            return ApiError::Validation("Invalid identifier.".into());
        }
        error!(error = %err, "{msg}");
        ApiError::Internal(msg.to_string())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        error!("consistency violation: {msg}");
        ApiError::Consistency(msg)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Consistency(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "Error": self.to_string() }))).into_response()
    }
}
