use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::CoreErrorKind;
use serde_json::json;

use crate::domain::error::{PixKeyError, WalletError};

/// Error unificado de la API HTTP del Wallet Service. Cada variante de
/// dominio se traduce primero al identificador estable de
/// `common::CoreErrorKind` (§7 de la especificación) y luego a un status
/// HTTP, de modo que el mismo vocabulario de error es recuperable sin
/// importar si la falla vino de este servicio o de `transaction_service`.
pub enum ApiError {
    Wallet(WalletError),
    PixKey(PixKeyError),
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        ApiError::Wallet(err)
    }
}

impl From<PixKeyError> for ApiError {
    fn from(err: PixKeyError) -> Self {
        ApiError::PixKey(err)
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
        CoreErrorKind::DataIntegrityViolation => StatusCode::BAD_REQUEST,
        CoreErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (kind, message) = match &self {
            ApiError::Wallet(e) => (CoreErrorKind::from(e), e.to_string()),
            ApiError::PixKey(e) => (CoreErrorKind::from(e), e.to_string()),
        };

        let status = status_for(kind);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("wallet_service internal error: {}", message);
        }

        let body = Json(json!({
            "status": "error",
            "errorCode": kind.as_str(),
            "message": message,
        }));

        (status, body).into_response()
    }
}
