use std::sync::Arc;

use common::Money;

use crate::domain::entities::Wallet;
use crate::domain::error::WalletError;
use crate::domain::types::WalletId;
use crate::engine::WalletEngine;

/// Caso de uso para `POST /wallets/{id}/withdraw`. Delega en el Wallet Engine,
/// que falla con `InsufficientFunds` si el saldo resultante fuera negativo.
#[derive(Clone)]
pub struct WithdrawUseCase {
    engine: Arc<WalletEngine>,
}

impl WithdrawUseCase {
    pub fn new(engine: Arc<WalletEngine>) -> Self {
        Self { engine }
    }

    #[tracing::instrument(name = "WithdrawUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: Option<String>,
    ) -> Result<Wallet, WalletError> {
        let transaction_id = uuid::Uuid::new_v4().to_string();
        self.engine
            .debit(
                wallet_id,
                amount,
                description.unwrap_or_else(|| "withdrawal".to_string()),
                transaction_id,
            )
            .await
    }
}
