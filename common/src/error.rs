use thiserror::Error;

/// Stable, language-neutral error identifiers shared by every crate in the
/// workspace, so a failure can be recognized the same way whether it
/// surfaced from an HTTP handler, a gRPC call, or a background job.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorKind {
    #[error("INVALID_AMOUNT")]
    InvalidAmount,
    #[error("AMOUNT_OUT_OF_RANGE")]
    AmountOutOfRange,
    #[error("WALLET_NOT_FOUND")]
    WalletNotFound,
    #[error("DESTINATION_NOT_FOUND")]
    DestinationNotFound,
    #[error("INSUFFICIENT_FUNDS")]
    InsufficientFunds,
    #[error("DUPLICATE_USER")]
    DuplicateUser,
    #[error("ILLEGAL_STATE")]
    IllegalState,
    #[error("TRANSIENT_CONFLICT")]
    TransientConflict,
    #[error("DATA_INTEGRITY_VIOLATION")]
    DataIntegrityViolation,
    #[error("INTERNAL_ERROR")]
    InternalError,
}

impl CoreErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::AmountOutOfRange => "AMOUNT_OUT_OF_RANGE",
            Self::WalletNotFound => "WALLET_NOT_FOUND",
            Self::DestinationNotFound => "DESTINATION_NOT_FOUND",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::DuplicateUser => "DUPLICATE_USER",
            Self::IllegalState => "ILLEGAL_STATE",
            Self::TransientConflict => "TRANSIENT_CONFLICT",
            Self::DataIntegrityViolation => "DATA_INTEGRITY_VIOLATION",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}
