use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::domain::entities::{IdempotencyRecord, PixTransfer};
use crate::domain::error::{IdempotencyError, TransferError};
use crate::domain::types::TransferId;

/// Puerto de persistencia para `PixTransfer`. El motor de estado en memoria
/// (`state::TransferStateCache`) nunca reemplaza esta fuente de verdad — solo
/// la acelera (§9 Design Notes). `confirm`/`reject` encapsulan, cada una, el
/// ciclo completo de re-lectura con bloqueo pesimista + transición + persistencia
/// dentro de una única transacción SERIALIZABLE (equivalente a REQUIRES_NEW,
/// ya que cada llamada abre su propia transacción), igual que
/// `wallet_service::engine::WalletEngine` hace para crédito/débito.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PixTransferRepository: Send + Sync {
    async fn create(&self, transfer: PixTransfer) -> Result<PixTransfer, TransferError>;
    async fn find_by_id(&self, id: TransferId) -> Result<Option<PixTransfer>, TransferError>;
    async fn find_by_end_to_end_id(
        &self,
        end_to_end_id: &str,
    ) -> Result<Option<PixTransfer>, TransferError>;
    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<PixTransfer>, TransferError>;
    /// Relee bajo `SELECT ... FOR UPDATE`, llama `PixTransfer::confirm`, y
    /// persiste en la misma transacción (§4.5 paso 4, caso CONFIRMED).
    async fn confirm(
        &self,
        end_to_end_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PixTransfer, TransferError>;
    /// Igual que `confirm`, para el caso REJECTED.
    async fn reject(
        &self,
        end_to_end_id: &str,
        at: DateTime<Utc>,
        reason: String,
    ) -> Result<PixTransfer, TransferError>;
}

/// Puerto de persistencia para `IdempotencyRecord`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    async fn find(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyError>;
    /// Inserta dentro de una transacción `REQUIRES_NEW SERIALIZABLE`; si la
    /// restricción única `(scope, key)` se dispara, relee y retorna el
    /// ganador en vez de propagar el error (§4.3 paso 5).
    async fn insert_or_get_existing(
        &self,
        record: IdempotencyRecord,
    ) -> Result<IdempotencyRecord, IdempotencyError>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyError>;
}
