//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::PayloadTooLarge`] → 413
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::StorageFailure`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — missing field, invalid card number, or empty upload.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested card is not registered.
    #[error("not found: {0}")]
    NotFound(String),

    /// The uploaded batch file exceeds the configured size limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Encryption or decryption failed due to a crypto-layer error.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The storage collaborator could not serve the request.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::PayloadTooLarge(_) => 413,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::StorageFailure(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::PayloadTooLarge(_) => "payload_too_large",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::StorageFailure(_) => "storage_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
