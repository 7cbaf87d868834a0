use common::error::CoreErrorKind;
use thiserror::Error;

use crate::domain::types::TransferId;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Transfer not found: {0}")]
    NotFound(TransferId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount out of Pix range: {0}")]
    AmountOutOfRange(String),

    #[error("Source wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Destination Pix key not found or inactive: {0}")]
    DestinationNotFound(String),

    #[error("Insufficient funds in source wallet")]
    InsufficientFunds,

    #[error("Illegal transfer state transition from {0}")]
    IllegalState(&'static str),

    #[error("Transient conflict: {0}")]
    TransientConflict(String),

    #[error("Data integrity violation: {0}")]
    DataIntegrityViolation(String),

    #[error("Gateway error: {0}")]
    GatewayError(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl From<&TransferError> for CoreErrorKind {
    fn from(err: &TransferError) -> Self {
        match err {
            TransferError::NotFound(_) => CoreErrorKind::WalletNotFound,
            TransferError::InvalidAmount(_) => CoreErrorKind::InvalidAmount,
            TransferError::AmountOutOfRange(_) => CoreErrorKind::AmountOutOfRange,
            TransferError::WalletNotFound(_) => CoreErrorKind::WalletNotFound,
            TransferError::DestinationNotFound(_) => CoreErrorKind::DestinationNotFound,
            TransferError::InsufficientFunds => CoreErrorKind::InsufficientFunds,
            TransferError::IllegalState(_) => CoreErrorKind::IllegalState,
            TransferError::TransientConflict(_) => CoreErrorKind::TransientConflict,
            TransferError::DataIntegrityViolation(_) => CoreErrorKind::DataIntegrityViolation,
            TransferError::GatewayError(_) | TransferError::RepositoryError(_) => {
                CoreErrorKind::InternalError
            }
        }
    }
}

/// Surge de `IdempotencyService`. No se traduce al vocabulario de
/// `CoreErrorKind` — el servicio de idempotencia es una preocupación
/// transversal, no un resultado financiero; sus llamadores (`AtomicTransferService`,
/// `TransferOrchestrator`) deciden cómo absorber cada variante.
#[derive(Error, Debug)]
pub enum IdempotencyError {
    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Lease timed out for idempotency key: {0}")]
    LeaseTimeout(String),
}
