use std::sync::Arc;

use common::Money;

use crate::domain::entities::Wallet;
use crate::domain::error::WalletError;
use crate::domain::types::WalletId;
use crate::engine::WalletEngine;

/// Caso de uso para `POST /wallets/{id}/deposit`. Delega enteramente en el
/// Wallet Engine (§4.2): valida que el monto sea positivo, acredita bajo el
/// lease exclusivo de la wallet, y anexa el `LedgerEntry` correspondiente.
#[derive(Clone)]
pub struct DepositUseCase {
    engine: Arc<WalletEngine>,
}

impl DepositUseCase {
    pub fn new(engine: Arc<WalletEngine>) -> Self {
        Self { engine }
    }

    #[tracing::instrument(name = "DepositUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: Option<String>,
    ) -> Result<Wallet, WalletError> {
        let transaction_id = uuid::Uuid::new_v4().to_string();
        self.engine
            .credit(
                wallet_id,
                amount,
                description.unwrap_or_else(|| "deposit".to_string()),
                transaction_id,
            )
            .await
    }
}
