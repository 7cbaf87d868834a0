use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::domain::error::TransferError;
use crate::domain::gateways::WalletGateway;
use crate::domain::types::WalletId;
use common::Money;

/// Implementación en memoria del Wallet Gateway para desarrollo y testing
/// sin levantar `wallet_service`. Simula saldos con un mapa concurrente en
/// lugar de acertar contra Postgres; los débitos fallan con
/// `InsufficientFunds` igual que haría el Wallet Engine real.
pub struct FakeWalletGateway {
    balances: DashMap<WalletId, i64>,
    pix_keys: DashMap<String, WalletId>,
}

impl FakeWalletGateway {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            pix_keys: DashMap::new(),
        }
    }

    pub fn seed_balance(&self, wallet_id: WalletId, amount: Money) {
        self.balances.insert(wallet_id, amount.minor_units());
    }

    pub fn seed_pix_key(&self, key_value: impl Into<String>, wallet_id: WalletId) {
        self.pix_keys.insert(key_value.into(), wallet_id);
    }

    pub fn balance_of(&self, wallet_id: WalletId) -> i64 {
        self.balances.get(&wallet_id).map(|b| *b).unwrap_or(0)
    }
}

impl Default for FakeWalletGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletGateway for FakeWalletGateway {
    async fn debit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        _description: String,
        transaction_id: String,
    ) -> Result<(), TransferError> {
        info!(
            "[FakeWalletGateway] debit {} from {} (txn {})",
            amount.minor_units(),
            wallet_id,
            transaction_id
        );

        let mut entry = self
            .balances
            .entry(wallet_id)
            .or_insert(0);

        if *entry < amount.minor_units() {
            return Err(TransferError::InsufficientFunds);
        }

        *entry -= amount.minor_units();
        Ok(())
    }

    async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        _description: String,
        transaction_id: String,
    ) -> Result<(), TransferError> {
        info!(
            "[FakeWalletGateway] credit {} to {} (txn {})",
            amount.minor_units(),
            wallet_id,
            transaction_id
        );

        let mut entry = self.balances.entry(wallet_id).or_insert(0);
        *entry += amount.minor_units();
        Ok(())
    }

    async fn resolve_pix_key(&self, key_value: &str) -> Result<Option<WalletId>, TransferError> {
        Ok(self.pix_keys.get(key_value).map(|w| *w))
    }
}
