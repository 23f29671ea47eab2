//! Axum request handlers for all service endpoints.
//!
//! Registry calls are synchronous and may hit a slow store, so they run on the
//! blocking pool.

use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, QueryRejection},
        Multipart, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use common::protocol::{BatchUploadResponse, CardRequest, CardResponse, ErrorResponse, HealthResponse};
use common::ServiceError;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::state::AppState;
use crate::batch::is_valid_card_number;
use crate::registry::{CardRegistry, RegistrationStatus, RegistryError};

/// Multipart field carrying the batch file.
const FILE_FIELD: &str = "file";

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Cipher(e) => ServiceError::EncryptionFailure(e.to_string()),
            RegistryError::Store(e) => ServiceError::StorageFailure(e.to_string()),
        }
    }
}

/// Render a [`ServiceError`] as a JSON [`ErrorResponse`].
///
/// Server-side failures are logged and replaced with a generic message.
fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match &err {
        ServiceError::EncryptionFailure(_) | ServiceError::Internal(_) => {
            error!(error = %err, "request failed");
            ErrorResponse::new(err.code(), "internal server error")
        }
        ServiceError::StorageFailure(_) => {
            error!(error = %err, "storage unavailable");
            ErrorResponse::new(err.code(), "card storage is temporarily unavailable")
        }
        _ => ErrorResponse::from(&err),
    };
    (status, Json(body)).into_response()
}

/// Run a registry operation on the blocking pool.
async fn with_registry<T, F>(state: &AppState, op: F) -> Result<T, ServiceError>
where
    F: FnOnce(&CardRegistry) -> T + Send + 'static,
    T: Send + 'static,
{
    let registry = state.registry.clone();
    tokio::task::spawn_blocking(move || op(&registry))
        .await
        .map_err(|e| ServiceError::Internal(format!("registry task failed: {e}")))
}

/// `POST /api/v1/cards` — register a single card number.
///
/// Returns `201 Created` for a new card and `200 OK` with the existing
/// identifier when the card was already registered.
pub async fn register_card(
    State(state): State<AppState>,
    body: Result<Json<CardRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => {
            let err = ErrorResponse::new("bad_request", "invalid request body")
                .with_details(vec![rejection.body_text()]);
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    let card_number = req.card_number.trim().to_owned();
    if let Some(problem) = validate_card_number(&card_number) {
        let err = ErrorResponse::new("validation_error", "field validation error")
            .with_details(vec![problem.into()]);
        return (StatusCode::BAD_REQUEST, Json(err)).into_response();
    }

    let result = with_registry(&state, move |r| r.register(&card_number))
        .await
        .and_then(|res| res.map_err(ServiceError::from));

    match result {
        Ok(reg) => match reg.status {
            RegistrationStatus::Registered => (
                StatusCode::CREATED,
                Json(CardResponse::new(reg.public_id, "card registered")),
            )
                .into_response(),
            RegistrationStatus::AlreadyRegistered => (
                StatusCode::OK,
                Json(CardResponse::new(reg.public_id, "card already registered")),
            )
                .into_response(),
        },
        Err(e) => error_response(e),
    }
}

/// `POST /api/v1/cards/batch` — ingest a fixed-width batch file.
///
/// Expects a multipart form with the file in the `file` field. The response
/// always carries the full accounting, even when every line was rejected.
pub async fn upload_batch(
    State(state): State<AppState>,
    multipart: Result<Multipart, axum::extract::multipart::MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            return error_response(ServiceError::BadRequest(rejection.body_text()));
        }
    };

    let file = match read_file_field(&mut multipart).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            return error_response(ServiceError::BadRequest(format!(
                "the field '{FILE_FIELD}' is required"
            )));
        }
        Err(e) => return error_response(e),
    };

    if file.is_empty() {
        return error_response(ServiceError::BadRequest("the uploaded file is empty".into()));
    }

    info!(bytes = file.len(), "batch upload received");
    match with_registry(&state, move |r| r.ingest_batch(&file)).await {
        Ok(outcome) => (StatusCode::OK, Json(BatchUploadResponse::from(outcome))).into_response(),
        Err(e) => error_response(e),
    }
}

/// Query parameters for `GET /api/v1/cards/search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    card_number: String,
}

/// `GET /api/v1/cards/search?cardNumber=...` — look up a card's public identifier.
pub async fn search_card(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    let card_number = match params {
        Ok(Query(p)) if !p.card_number.trim().is_empty() => p.card_number,
        _ => {
            return error_response(ServiceError::BadRequest(
                "the parameter 'cardNumber' is required".into(),
            ));
        }
    };

    let result = with_registry(&state, move |r| r.find(&card_number))
        .await
        .and_then(|res| res.map_err(ServiceError::from));

    match result {
        Ok(Some(public_id)) => {
            (StatusCode::OK, Json(CardResponse::new(public_id, "card found"))).into_response()
        }
        Ok(None) => error_response(ServiceError::NotFound("card is not registered".into())),
        Err(e) => error_response(e),
    }
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when the card store can be read, `503` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    match with_registry(&state, |r| r.stored_cards()).await {
        Ok(Ok(count)) => {
            let body = HealthResponse {
                status: "ok".into(),
                cards_stored: Some(count),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => {
            warn!(error = %e, "health check: store unreadable");
            degraded()
        }
        Err(e) => {
            warn!(error = %e, "health check failed");
            degraded()
        }
    }
}

fn degraded() -> Response {
    let body = HealthResponse {
        status: "degraded".into(),
        cards_stored: None,
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Validation message for a trimmed card number, or `None` if it is acceptable.
fn validate_card_number(card_number: &str) -> Option<&'static str> {
    if card_number.is_empty() {
        Some("card number is required")
    } else if !is_valid_card_number(card_number) {
        Some("card number must contain between 13 and 19 numeric digits")
    } else {
        None
    }
}

/// Read the `file` field of a multipart form, skipping any other fields.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Bytes>, ServiceError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(FILE_FIELD) {
            return field.bytes().await.map(Some).map_err(multipart_error);
        }
    }
    Ok(None)
}

fn multipart_error(err: MultipartError) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge("file exceeds the maximum allowed size".into())
    } else {
        ServiceError::BadRequest(err.body_text())
    }
}
