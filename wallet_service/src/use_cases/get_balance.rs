use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Clock, Money};

use crate::domain::error::WalletError;
use crate::domain::types::WalletId;
use crate::engine::WalletEngine;

/// Resultado de `GET /wallets/{id}/balance`. Cuando `at` no se especifica en
/// la petición, `timestamp` refleja el instante en que se realizó la
/// consulta (no `wallet.updated_at`), consistente con la semántica de
/// "saldo actual" de la wallet.
#[derive(Debug, Clone)]
pub struct BalanceView {
    pub wallet_id: WalletId,
    pub balance: Money,
    pub timestamp: DateTime<Utc>,
}

/// Caso de uso para `GET /wallets/{id}/balance?at=ISO8601?`. Sin `at`, delega
/// en `WalletEngine::balance` (lectura directa de la fila); con `at`, delega
/// en `WalletEngine::balance_at` (replay determinista del libro mayor, §4.2).
#[derive(Clone)]
pub struct GetBalanceUseCase {
    engine: Arc<WalletEngine>,
    clock: Arc<dyn Clock>,
}

impl GetBalanceUseCase {
    pub fn new(engine: Arc<WalletEngine>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    #[tracing::instrument(name = "GetBalanceUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        wallet_id: WalletId,
        at: Option<DateTime<Utc>>,
    ) -> Result<BalanceView, WalletError> {
        match at {
            Some(at) => {
                let balance = self.engine.balance_at(wallet_id, at).await?;
                Ok(BalanceView {
                    wallet_id,
                    balance,
                    timestamp: at,
                })
            }
            None => {
                let wallet = self.engine.balance(wallet_id).await?;
                Ok(BalanceView {
                    wallet_id,
                    balance: wallet.balance(),
                    timestamp: self.clock.now(),
                })
            }
        }
    }
}
