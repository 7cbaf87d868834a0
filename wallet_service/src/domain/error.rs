use crate::domain::types::{PixKeyId, UserId, WalletId};
use common::error::CoreErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wallet not found with ID: {0}")]
    NotFound(WalletId),

    #[error("User not found with ID: {0}")]
    UserNotFound(UserId),

    #[error("User {0} already has a wallet")]
    DuplicateUser(UserId),

    #[error("Invalid wallet data: {0}")]
    InvalidData(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount out of Pix range: {0}")]
    AmountOutOfRange(String),

    #[error("Insufficient funds in wallet: {0}")]
    InsufficientFunds(WalletId),

    #[error("Optimistic locking conversion error: {0}")]
    ConcurrencyError(String),

    #[error("Timed out waiting for wallet lease on {0}")]
    LeaseTimeout(WalletId),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl From<&WalletError> for CoreErrorKind {
    fn from(err: &WalletError) -> Self {
        match err {
            WalletError::NotFound(_) | WalletError::UserNotFound(_) => {
                CoreErrorKind::WalletNotFound
            }
            WalletError::DuplicateUser(_) => CoreErrorKind::DuplicateUser,
            WalletError::InvalidData(_) | WalletError::InvalidAmount(_) => {
                CoreErrorKind::InvalidAmount
            }
            WalletError::AmountOutOfRange(_) => CoreErrorKind::AmountOutOfRange,
            WalletError::InsufficientFunds(_) => CoreErrorKind::InsufficientFunds,
            WalletError::ConcurrencyError(_) | WalletError::LeaseTimeout(_) => {
                CoreErrorKind::TransientConflict
            }
            WalletError::RepositoryError(_) => CoreErrorKind::InternalError,
        }
    }
}

#[derive(Error, Debug)]
pub enum PixKeyError {
    #[error("Pix key not found with ID: {0}")]
    NotFound(PixKeyId),

    #[error("Pix key already registered and active: {0}")]
    AlreadyActive(String),

    #[error("Invalid pix key data: {0}")]
    InvalidData(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl From<&PixKeyError> for CoreErrorKind {
    fn from(err: &PixKeyError) -> Self {
        match err {
            PixKeyError::NotFound(_) => CoreErrorKind::DestinationNotFound,
            PixKeyError::AlreadyActive(_) => CoreErrorKind::DataIntegrityViolation,
            PixKeyError::InvalidData(_) => CoreErrorKind::InternalError,
            PixKeyError::RepositoryError(_) => CoreErrorKind::InternalError,
        }
    }
}
