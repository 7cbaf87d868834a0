use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::CoreErrorKind;
use serde_json::json;

use crate::domain::error::{IdempotencyError, TransferError};

/// Error unificado de la API HTTP del Transaction Service. `TransferError`
/// se traduce primero al vocabulario estable de `common::CoreErrorKind` (§7),
/// igual que `wallet_service::api::error::ApiError`. `IdempotencyError` no
/// participa de ese vocabulario (ver nota en `domain::error`) y se traduce
/// directamente a un status — es una falla de infraestructura de la capa de
/// idempotencia, no un resultado financiero.
pub enum ApiError {
    Transfer(TransferError),
    Idempotency(IdempotencyError),
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        ApiError::Transfer(err)
    }
}

impl From<IdempotencyError> for ApiError {
    fn from(err: IdempotencyError) -> Self {
        ApiError::Idempotency(err)
    }
}

fn status_for(kind: CoreErrorKind) -> StatusCode {
    match kind {
        CoreErrorKind::InvalidAmount | CoreErrorKind::AmountOutOfRange => StatusCode::BAD_REQUEST,
        CoreErrorKind::WalletNotFound | CoreErrorKind::DestinationNotFound => {
            StatusCode::NOT_FOUND
        }
        CoreErrorKind::InsufficientFunds => StatusCode::BAD_REQUEST,
        CoreErrorKind::DuplicateUser => StatusCode::BAD_REQUEST,
        CoreErrorKind::IllegalState => StatusCode::CONFLICT,
        CoreErrorKind::TransientConflict => StatusCode::CONFLICT,
        // Nunca debería llegar hasta acá — la Atomic Transfer Service la
        // absorbe vía compensación (§4.5 paso 4) antes de propagarla. Si lo
        // hace, es un defecto de la capa inferior, no una respuesta de
        // negocio esperada.
        CoreErrorKind::DataIntegrityViolation => StatusCode::INTERNAL_SERVER_ERROR,
        CoreErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Transfer(e) => {
                let kind = CoreErrorKind::from(e);
                (status_for(kind), kind.as_str(), e.to_string())
            }
            ApiError::Idempotency(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "INTERNAL_ERROR",
                e.to_string(),
            ),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR || status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("transaction_service internal error: {}", message);
        }

        let body = Json(json!({
            "status": "error",
            "errorCode": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
