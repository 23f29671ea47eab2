//! Request and response types exchanged with callers.
//!
//! Field names are camelCase on the wire to stay compatible with existing
//! clients of the card API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Single card endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/cards`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    /// Full card number, 13 to 19 digits once surrounding whitespace is trimmed.
    pub card_number: String,
}

/// Response body for card registration and search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    /// Public identifier of the stored card. Never derived from the card number.
    pub external_id: Uuid,
    /// Human-readable outcome, e.g. `"card registered"`.
    pub message: String,
}

impl CardResponse {
    /// Construct a [`CardResponse`] from an identifier and message.
    pub fn new(external_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            external_id,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch endpoint
// ---------------------------------------------------------------------------

/// Response body for `POST /api/v1/cards/batch`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadResponse {
    /// Batch identifier from the file header; empty when the header was missing.
    pub batch_id: String,
    /// Batch name from the file header.
    pub batch_name: String,
    /// Batch date (`YYYYMMDD`) from the file header, not validated.
    pub batch_date: String,
    /// Record count declared by the header. Informational only.
    pub expected_count: i32,
    /// Number of card numbers extracted from the file.
    pub total_processed: usize,
    /// Cards stored or already present.
    pub total_success: usize,
    /// Parser diagnostics plus per-card failures.
    pub total_errors: usize,
    /// Ordered failure messages.
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Field-level validation messages, when there are any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Attach validation details.
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Number of card records currently stored, when the store is readable.
    pub cards_stored: Option<usize>,
}
