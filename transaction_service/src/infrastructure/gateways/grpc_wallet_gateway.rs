use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::proto::wallet::wallet_service_client::WalletServiceClient;
use crate::api::proto::wallet::{CreditRequest, DebitRequest, ResolvePixKeyRequest};
use crate::domain::error::TransferError;
use crate::domain::gateways::WalletGateway;
use crate::domain::types::WalletId;
use common::Money;

fn error_for_code(code: &str, message: String) -> TransferError {
    match code {
        "INVALID_AMOUNT" => TransferError::InvalidAmount(message),
        "AMOUNT_OUT_OF_RANGE" => TransferError::AmountOutOfRange(message),
        "WALLET_NOT_FOUND" => TransferError::WalletNotFound(message),
        "DESTINATION_NOT_FOUND" => TransferError::DestinationNotFound(message),
        "INSUFFICIENT_FUNDS" => TransferError::InsufficientFunds,
        "TRANSIENT_CONFLICT" => TransferError::TransientConflict(message),
        "DATA_INTEGRITY_VIOLATION" => TransferError::DataIntegrityViolation(message),
        _ => TransferError::GatewayError(message),
    }
}

/// Puente hacia el Wallet Engine real, cruzando al proceso de `wallet_service`
/// por gRPC. Reconecta en cada llamada en vez de
/// mantener un canal persistente porque `tonic::transport::Channel` ya agrupa
/// conexiones internamente y reintenta la resolución DNS de forma perezosa.
pub struct GrpcWalletGateway {
    wallet_url: String,
}

impl GrpcWalletGateway {
    pub fn new(wallet_url: String) -> Self {
        Self { wallet_url }
    }

    async fn connect(&self) -> Result<WalletServiceClient<Channel>, TransferError> {
        WalletServiceClient::connect(self.wallet_url.clone())
            .await
            .map_err(|e| {
                TransferError::GatewayError(format!(
                    "failed to connect to wallet_service at {}: {}",
                    self.wallet_url, e
                ))
            })
    }
}

#[async_trait]
impl WalletGateway for GrpcWalletGateway {
    #[tracing::instrument(name = "GrpcWalletGateway::debit", skip(self))]
    async fn debit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
    ) -> Result<(), TransferError> {
        let mut client = self.connect().await?;
        let request = tonic::Request::new(DebitRequest {
            wallet_id: wallet_id.to_string(),
            amount_cents: amount.minor_units(),
            description,
            transaction_id,
        });

        let reply = client
            .debit(request)
            .await
            .map_err(|e| {
                error!("grpc debit call failed: {}", e);
                TransferError::GatewayError(e.to_string())
            })?
            .into_inner();

        if reply.success {
            Ok(())
        } else {
            Err(error_for_code(&reply.error_code, reply.error_message))
        }
    }

    #[tracing::instrument(name = "GrpcWalletGateway::credit", skip(self))]
    async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
    ) -> Result<(), TransferError> {
        let mut client = self.connect().await?;
        let request = tonic::Request::new(CreditRequest {
            wallet_id: wallet_id.to_string(),
            amount_cents: amount.minor_units(),
            description,
            transaction_id,
        });

        let reply = client
            .credit(request)
            .await
            .map_err(|e| {
                error!("grpc credit call failed: {}", e);
                TransferError::GatewayError(e.to_string())
            })?
            .into_inner();

        if reply.success {
            Ok(())
        } else {
            Err(error_for_code(&reply.error_code, reply.error_message))
        }
    }

    #[tracing::instrument(name = "GrpcWalletGateway::resolve_pix_key", skip(self))]
    async fn resolve_pix_key(&self, key_value: &str) -> Result<Option<WalletId>, TransferError> {
        let mut client = self.connect().await?;
        let request = tonic::Request::new(ResolvePixKeyRequest {
            key_value: key_value.to_string(),
            key_type: String::new(),
        });

        let reply = client
            .resolve_pix_key(request)
            .await
            .map_err(|e| {
                error!("grpc resolve_pix_key call failed: {}", e);
                TransferError::GatewayError(e.to_string())
            })?
            .into_inner();

        if !reply.found {
            return Ok(None);
        }

        let wallet_id = Uuid::parse_str(&reply.wallet_id)
            .map(WalletId)
            .map_err(|_| {
                TransferError::GatewayError(format!(
                    "wallet_service returned malformed wallet_id: {}",
                    reply.wallet_id
                ))
            })?;

        info!("resolved pix key to wallet {}", wallet_id);
        Ok(Some(wallet_id))
    }
}
