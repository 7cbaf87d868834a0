use std::sync::Arc;

use common::{CoreErrorKind, Money};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::api::proto::wallet::{
    wallet_service_server::WalletService as WalletServiceTrait, BalanceReply, CreditRequest,
    DebitRequest, GetBalanceRequest, MovementReply, ResolvePixKeyReply, ResolvePixKeyRequest,
};
use crate::domain::entities::PixKeyType;
use crate::domain::error::WalletError;
use crate::domain::repository::PixKeyRepository;
use crate::domain::types::WalletId;
use crate::engine::WalletEngine;

/// Servicio gRPC que expone el Wallet Engine a `transaction_service`'s
/// `GrpcWalletGateway` (véase SPEC_FULL.md §0/§8). Nunca abre su propia
/// transacción: delega enteramente en `WalletEngine`, que ya implementa el
/// lease exclusivo + SERIALIZABLE + `SELECT ... FOR UPDATE` de §4.2.
pub struct WalletGrpcService {
    engine: Arc<WalletEngine>,
    pix_key_repo: Arc<dyn PixKeyRepository>,
}

impl WalletGrpcService {
    pub fn new(engine: Arc<WalletEngine>, pix_key_repo: Arc<dyn PixKeyRepository>) -> Self {
        Self {
            engine,
            pix_key_repo,
        }
    }
}

fn parse_pix_key_type(raw: &str) -> Result<PixKeyType, Status> {
    match raw {
        "EMAIL" => Ok(PixKeyType::Email),
        "PHONE" => Ok(PixKeyType::Phone),
        "NATIONAL_ID" => Ok(PixKeyType::NationalId),
        "RANDOM" => Ok(PixKeyType::Random),
        other => Err(Status::invalid_argument(format!(
            "unknown pix key type: {}",
            other
        ))),
    }
}

fn parse_wallet_id(raw: &str) -> Result<WalletId, Status> {
    Uuid::parse_str(raw)
        .map(WalletId)
        .map_err(|_| Status::invalid_argument(format!("malformed wallet_id: {}", raw)))
}

fn movement_reply_for_error(err: WalletError) -> MovementReply {
    let kind: CoreErrorKind = (&err).into();
    MovementReply {
        success: false,
        balance_cents: 0,
        error_code: kind.as_str().to_string(),
        error_message: err.to_string(),
    }
}

#[tonic::async_trait]
impl WalletServiceTrait for WalletGrpcService {
    #[tracing::instrument(name = "WalletGrpcService::credit", skip(self, request))]
    async fn credit(
        &self,
        request: Request<CreditRequest>,
    ) -> Result<Response<MovementReply>, Status> {
        let req = request.into_inner();
        let wallet_id = parse_wallet_id(&req.wallet_id)?;
        let amount = Money::from_minor_units(req.amount_cents);

        match self
            .engine
            .credit(wallet_id, amount, req.description, req.transaction_id)
            .await
        {
            Ok(wallet) => Ok(Response::new(MovementReply {
                success: true,
                balance_cents: wallet.balance().minor_units(),
                error_code: String::new(),
                error_message: String::new(),
            })),
            Err(err) => Ok(Response::new(movement_reply_for_error(err))),
        }
    }

    #[tracing::instrument(name = "WalletGrpcService::debit", skip(self, request))]
    async fn debit(
        &self,
        request: Request<DebitRequest>,
    ) -> Result<Response<MovementReply>, Status> {
        let req = request.into_inner();
        let wallet_id = parse_wallet_id(&req.wallet_id)?;
        let amount = Money::from_minor_units(req.amount_cents);

        match self
            .engine
            .debit_for_transfer(wallet_id, amount, req.description, req.transaction_id)
            .await
        {
            Ok(wallet) => Ok(Response::new(MovementReply {
                success: true,
                balance_cents: wallet.balance().minor_units(),
                error_code: String::new(),
                error_message: String::new(),
            })),
            Err(err) => Ok(Response::new(movement_reply_for_error(err))),
        }
    }

    #[tracing::instrument(name = "WalletGrpcService::get_balance", skip(self, request))]
    async fn get_balance(
        &self,
        request: Request<GetBalanceRequest>,
    ) -> Result<Response<BalanceReply>, Status> {
        let req = request.into_inner();
        let wallet_id = parse_wallet_id(&req.wallet_id)?;

        match self.engine.balance(wallet_id).await {
            Ok(wallet) => Ok(Response::new(BalanceReply {
                found: true,
                balance_cents: wallet.balance().minor_units(),
            })),
            Err(WalletError::NotFound(_)) => Ok(Response::new(BalanceReply {
                found: false,
                balance_cents: 0,
            })),
            Err(err) => Err(Status::internal(err.to_string())),
        }
    }

    #[tracing::instrument(name = "WalletGrpcService::resolve_pix_key", skip(self, request))]
    async fn resolve_pix_key(
        &self,
        request: Request<ResolvePixKeyRequest>,
    ) -> Result<Response<ResolvePixKeyReply>, Status> {
        let req = request.into_inner();
        let lookup = if req.key_type.is_empty() {
            self.pix_key_repo.find_active_by_value(&req.key_value).await
        } else {
            let key_type = parse_pix_key_type(&req.key_type)?;
            self.pix_key_repo
                .find_active_by_value_and_type(&req.key_value, key_type)
                .await
        };

        match lookup {
            Ok(Some(pix_key)) => Ok(Response::new(ResolvePixKeyReply {
                found: true,
                wallet_id: pix_key.wallet_id().to_string(),
            })),
            Ok(None) => Ok(Response::new(ResolvePixKeyReply {
                found: false,
                wallet_id: String::new(),
            })),
            Err(err) => Err(Status::internal(err.to_string())),
        }
    }
}
