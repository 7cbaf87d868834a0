use tonic::async_trait;

use common::Money;

use crate::domain::error::TransferError;
use crate::domain::types::WalletId;

/// Puerto hacia el Wallet Engine de `wallet_service`, cruzado por gRPC
/// (`GrpcWalletGateway`) o simulado en memoria (`FakeWalletGateway`). La
/// Atomic Transfer Service nunca habla con `wallet_service` directamente —
/// siempre a través de este trait, igual que el `ProcessMovementUseCase`
/// original del profesor hablaba solo a través de `WalletGateway`.
#[async_trait]
pub trait WalletGateway: Send + Sync {
    /// Debita `amount` de `wallet_id`. Falla con `InsufficientFunds` o
    /// `WalletNotFound` — el llamador decide si compensar.
    async fn debit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
    ) -> Result<(), TransferError>;

    /// Acredita `amount` a `wallet_id`. Usado tanto para el crédito al
    /// destino en CONFIRMED como para el reembolso al origen en REJECTED o
    /// en la compensación de una inserción perdida (§4.5).
    async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
    ) -> Result<(), TransferError>;

    /// Resuelve una clave Pix activa a la wallet que la posee. `None` si la
    /// clave no existe o está inactiva.
    async fn resolve_pix_key(&self, key_value: &str) -> Result<Option<WalletId>, TransferError>;
}
