//! Error types for Mangrove.
//!
//! This module provides the [`MangroveError`] type, the standard error used
//! throughout the integration layer. Every variant maps onto one of the five
//! failure classes the layer distinguishes:
//!
//! | Category | Trigger | Status |
//! |---|---|---|
//! | `Config` | missing/invalid connection URI or settings | 500 (fatal at setup) |
//! | `NotFound` | invalid identifier, missing document or file | 404 |
//! | `RequestValidation` | malformed or type-mismatched request body | 400 |
//! | `ResponseContract` | handler returned a value incompatible with its declared model | 500 |
//! | `Driver` | network failure, duplicate key, … | 500 (propagated, never retried) |
//!
//! Not-found conditions are recovered locally by translating to a 404; they
//! are never surfaced as a 500. Driver errors are the opposite: this layer
//! does not catch them, it only carries them to the host framework's error
//! handling.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`MangroveError`].
pub type MangroveResult<T> = Result<T, MangroveError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Setup/configuration errors (missing URI, invalid settings).
    Config,
    /// Resource not found (invalid id, missing document, missing file).
    NotFound,
    /// Request body failed schema validation.
    RequestValidation,
    /// Handler response failed schema validation.
    ResponseContract,
    /// Errors surfaced by the MongoDB driver.
    Driver,
}

impl ErrorCategory {
    /// Returns the HTTP status code for this error category.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Config => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RequestValidation => StatusCode::BAD_REQUEST,
            Self::ResponseContract => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Driver => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code used in the JSON error envelope.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config => "CONFIGURATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::RequestValidation => "REQUEST_VALIDATION_FAILED",
            Self::ResponseContract => "RESPONSE_CONTRACT_VIOLATION",
            Self::Driver => "DRIVER_ERROR",
        }
    }
}

/// Standard error type for the Mangrove integration layer.
///
/// # Example
///
/// ```
/// use mangrove_core::{ErrorCategory, MangroveError};
///
/// let err = MangroveError::not_found("document");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
/// ```
#[derive(Error, Debug)]
pub enum MangroveError {
    /// Configuration failed before the application could start.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// A requested resource does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// What was looked up (e.g. `"document"`, `"file"`).
        resource: String,
    },

    /// The request body did not match the declared model.
    #[error("request validation failed: {detail}")]
    RequestValidation {
        /// The underlying validation detail, kept for diagnostics.
        detail: String,
    },

    /// The handler returned a value incompatible with its declared model.
    #[error("response contract violation: {detail}")]
    ResponseContract {
        /// Description of the mismatch.
        detail: String,
    },

    /// An error surfaced by the MongoDB driver.
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    /// An I/O error while streaming file content.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MangroveError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a not-found error for the named resource.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a request validation error carrying the underlying detail.
    pub fn request_validation(detail: impl Into<String>) -> Self {
        Self::RequestValidation {
            detail: detail.into(),
        }
    }

    /// Creates a response contract violation.
    pub fn response_contract(detail: impl Into<String>) -> Self {
        Self::ResponseContract {
            detail: detail.into(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } => ErrorCategory::Config,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::RequestValidation { .. } => ErrorCategory::RequestValidation,
            Self::ResponseContract { .. } => ErrorCategory::ResponseContract,
            Self::Driver(_) | Self::Io(_) => ErrorCategory::Driver,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.category().status_code()
    }

    /// Serializes this error into the JSON envelope sent to clients.
    ///
    /// Driver and configuration details are not exposed on the wire; they
    /// carry internal information and are logged instead.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        let category = self.category();
        let message = match self {
            Self::RequestValidation { .. } | Self::NotFound { .. } => self.to_string(),
            Self::Config { .. } => "configuration error".to_string(),
            Self::ResponseContract { .. } => "internal response contract violation".to_string(),
            Self::Driver(_) | Self::Io(_) => "database error".to_string(),
        };
        ErrorEnvelope {
            error: category.error_code().to_string(),
            message,
        }
    }
}

/// JSON body produced for error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Stable machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

impl IntoResponse for MangroveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(category = ?self.category(), error = %self, "request failed");
        } else {
            tracing::debug!(category = ?self.category(), error = %self, "request rejected");
        }
        (status, axum::Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_status_codes() {
        assert_eq!(
            ErrorCategory::NotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCategory::RequestValidation.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCategory::ResponseContract.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCategory::Config.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_error() {
        let err = MangroveError::not_found("file");
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_request_validation_keeps_detail() {
        let err = MangroveError::request_validation("missing field `val` at line 1");
        assert!(err.to_string().contains("missing field `val`"));
        assert_eq!(err.envelope().error, "REQUEST_VALIDATION_FAILED");
        assert!(err.envelope().message.contains("missing field `val`"));
    }

    #[test]
    fn test_response_contract_hides_detail_from_wire() {
        let err = MangroveError::response_contract("handler returned {\"name\": ...}");
        let envelope = err.envelope();
        assert_eq!(envelope.error, "RESPONSE_CONTRACT_VIOLATION");
        assert!(!envelope.message.contains("handler returned"));
    }

    #[test]
    fn test_config_error() {
        let err = MangroveError::config("no MongoDB URI supplied");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(err.to_string().contains("no MongoDB URI supplied"));
        assert_eq!(err.envelope().error, "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_envelope_round_trips_as_json() {
        let envelope = MangroveError::not_found("document").envelope();
        let json = serde_json::to_string(&envelope).unwrap();
        let back: ErrorEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }

    #[tokio::test]
    async fn test_into_response_status() {
        let response = MangroveError::not_found("document").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = MangroveError::request_validation("bad body").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
