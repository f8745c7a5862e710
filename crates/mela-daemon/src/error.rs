//! Error types for the daemon
//!
//! Three layers, mapped at the API boundary: storage failures, API
//! rejections with their HTTP status, and daemon startup errors. Rejections
//! carry a `retryable` hint so clients can tell a lost race or a gateway
//! hiccup from a request that will never succeed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mela_lifecycle::{CodeError, InvoiceError, TransitionError};
use mela_payments::PaymentError;
use mela_types::UnknownCategory;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conditional write lost its race or a uniqueness rule was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid session
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Wrong role or ownership
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input or a business rule said no
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Shape-level validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lost a compare-and-set race
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Payment or webhook signature did not verify; the target stays unpaid
    #[error("Payment not verified")]
    SignatureRejected,

    /// Gateway or messaging provider failure on a synchronous path
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,

    /// Whether retrying the same request can succeed
    pub retryable: bool,
}

impl ApiError {
    fn status_code_and_kind(&self) -> (StatusCode, &'static str, bool) {
        match self {
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", false),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", false),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", false),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", false),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", false),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT", true),
            ApiError::SignatureRejected => {
                (StatusCode::BAD_REQUEST, "PAYMENT_NOT_VERIFIED", false)
            }
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", true),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", true),
            ApiError::Storage(StorageError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", false)
            }
            ApiError::Storage(StorageError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT", true),
            ApiError::Storage(StorageError::InvalidData(_)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", false)
            }
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", true),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, retryable) = self.status_code_and_kind();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            retryable,
        };

        (status, Json(body)).into_response()
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::ActorNotAllowed { .. } => ApiError::Forbidden(err.to_string()),
            TransitionError::InvalidForStatus { .. } | TransitionError::Terminal(_) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<CodeError> for ApiError {
    fn from(err: CodeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<UnknownCategory> for ApiError {
    fn from(err: UnknownCategory) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
