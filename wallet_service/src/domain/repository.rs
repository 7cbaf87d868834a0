use crate::domain::entities::{LedgerEntry, PixKey, PixKeyType, Wallet};
use crate::domain::error::{PixKeyError, WalletError};
use crate::domain::types::{PixKeyId, UserId, WalletId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

// Interface (Port) for Wallet persistence. The Wallet Engine does NOT go
// through this trait for credit/debit — those need fine-grained transaction
// control (SERIALIZABLE + SELECT FOR UPDATE + ledger append in one
// transaction) that a generic CRUD port would only obscure. This trait backs
// the read-mostly use cases (`get_wallet`, `get_user_wallets`, `create_wallet`).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError>;
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Wallet>, WalletError>;
    async fn create(&self, wallet: Wallet) -> Result<Wallet, WalletError>;
}

// Interface (Port) for Ledger persistence. Backs `balance_at` replay and
// wallet-history listing; the Wallet Engine appends through its own
// transaction, not through this trait.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn find_by_wallet_id(&self, wallet_id: WalletId) -> Result<Vec<LedgerEntry>, WalletError>;
    async fn sum_signed_amount_up_to(
        &self,
        wallet_id: WalletId,
        at: DateTime<Utc>,
    ) -> Result<i64, WalletError>;
}

// Interface (Port) for Pix key persistence.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PixKeyRepository: Send + Sync {
    async fn create(&self, pix_key: PixKey) -> Result<PixKey, PixKeyError>;
    async fn find_active_by_value_and_type(
        &self,
        key_value: &str,
        key_type: PixKeyType,
    ) -> Result<Option<PixKey>, PixKeyError>;
    /// Resuelve por valor solamente, sin importar el tipo. Una clave Pix
    /// activa es única por valor en todo el sistema (email, teléfono, CPF o
    /// aleatoria nunca se pisan); este método respalda la resolución desde
    /// `transaction_service`, que conoce `toPixKey` pero no necesariamente su tipo.
    async fn find_active_by_value(&self, key_value: &str) -> Result<Option<PixKey>, PixKeyError>;
    async fn find_by_id(&self, id: PixKeyId) -> Result<Option<PixKey>, PixKeyError>;
}
